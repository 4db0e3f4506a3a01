//! Application configuration with TOML persistence.
//!
//! Every section falls back to its defaults when omitted from the file.

use crate::error::{ConfigFileError, ConfigurationError, Result};
use crate::filter::FilterSpec;
use crate::layout::{LayoutEngine, LayoutSpec};
use crate::presets::find_preset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Band-pass filter parameters
    pub filter: FilterSpec,

    /// Sheet geometry
    pub paper: PaperConfig,

    /// Raster output
    pub render: RenderConfig,

    /// Layout selection
    pub layout: LayoutConfig,

    /// Pipeline execution
    pub processing: ProcessingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Sheet geometry in millimetres
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,

    /// Plot area width
    pub width_mm: f64,

    /// Plot area height, the vertical extent rows are laid into
    pub height_mm: f64,

    pub margin_bottom_mm: f64,

    /// Grid spacing; row centres snap to it
    pub grid_quantum_mm: f64,

    /// Trace amplitude scale
    pub mm_per_millivolt: f64,

    /// Separator markers span row height / this, above and below the centre
    pub marker_divisor: f64,
}

/// Raster output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output resolution
    pub pixels_per_mm: f64,

    pub background_color: [u8; 3],
    pub grid_color: [u8; 3],
    pub trace_color: [u8; 3],
    pub marker_color: [u8; 3],
}

/// Layout selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Layout used when none is requested explicitly
    pub default_preset: String,

    /// User-defined layouts; these shadow built-in presets of the same name
    pub custom: BTreeMap<String, LayoutSpec>,
}

/// Pipeline execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Calibrate and filter channels on scoped worker threads
    pub parallel_channels: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,

    /// Histogram precision (significant value digits)
    pub histogram_precision: u8,

    /// Maximum histogram value in microseconds
    pub histogram_max_us: u64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            paper_width_mm: 297.0,
            paper_height_mm: 210.0,
            width_mm: 250.0,
            height_mm: 170.0,
            margin_bottom_mm: 10.0,
            grid_quantum_mm: 5.0,
            mm_per_millivolt: 10.0,
            marker_divisor: 2.6,
        }
    }
}

impl PaperConfig {
    pub fn margin_left_mm(&self) -> f64 {
        0.5 * (self.paper_width_mm - self.width_mm)
    }

    pub fn layout_engine(&self) -> LayoutEngine {
        LayoutEngine::new(self.height_mm, self.grid_quantum_mm)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixels_per_mm: 4.0,
            background_color: [255, 255, 255],
            grid_color: [0xd4, 0x3d, 0x1a],
            trace_color: [0, 0, 0],
            marker_color: [0, 0, 255],
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_preset: "3x4_1".to_string(),
            custom: BTreeMap::new(),
        }
    }
}

impl LayoutConfig {
    /// Resolve a layout name: custom entries first, then built-in presets.
    pub fn resolve(&self, name: Option<&str>) -> Result<LayoutSpec, ConfigurationError> {
        let name = name.unwrap_or(&self.default_preset);
        if let Some(spec) = self.custom.get(name) {
            return Ok(spec.clone());
        }
        LayoutSpec::from_preset(name)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_channels: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_precision: 2,
            histogram_max_us: 60_000_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigFileError::LoadFailed {
                path: Box::new(path.to_path_buf()),
                source,
            })?;

        toml::from_str(&contents).map_err(|source| ConfigFileError::InvalidFormat {
            path: Box::new(path.to_path_buf()),
            source,
        })
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigFileError::SaveFailed {
                path: Box::new(path.to_path_buf()),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|source| ConfigFileError::SerializationFailed { source })?;

        std::fs::write(path, contents).map_err(|source| ConfigFileError::SaveFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ecgplot");

        config_dir.join("config.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        self.filter
            .validate()
            .map_err(|e| ConfigFileError::ValidationFailed {
                reason: e.to_string(),
            })?;

        if self.paper.width_mm <= 0.0 || self.paper.height_mm <= 0.0 {
            return Err(ConfigFileError::ValidationFailed {
                reason: "Plot area must have positive width and height".to_string(),
            });
        }

        if self.paper.width_mm > self.paper.paper_width_mm
            || self.paper.height_mm + self.paper.margin_bottom_mm > self.paper.paper_height_mm
        {
            return Err(ConfigFileError::ValidationFailed {
                reason: "Plot area does not fit on the paper".to_string(),
            });
        }

        if self.paper.grid_quantum_mm <= 0.0 {
            return Err(ConfigFileError::ValidationFailed {
                reason: format!(
                    "Grid quantum {}mm must be positive",
                    self.paper.grid_quantum_mm
                ),
            });
        }

        if !(0.5..=40.0).contains(&self.render.pixels_per_mm) {
            return Err(ConfigFileError::ValidationFailed {
                reason: format!(
                    "Resolution {} px/mm out of range 0.5-40",
                    self.render.pixels_per_mm
                ),
            });
        }

        let known = self.layout.custom.contains_key(&self.layout.default_preset)
            || find_preset(&self.layout.default_preset).is_some();
        if !known {
            return Err(ConfigFileError::ValidationFailed {
                reason: format!("Unknown default layout '{}'", self.layout.default_preset),
            });
        }

        Ok(())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            None
        }
    }
}
