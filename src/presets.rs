//! Named layout presets for standard 12-lead recordings.
//!
//! Channel indices follow the conventional lead order
//! I, II, III, aVR, aVL, aVF, V1-V6. The pipeline never consults this table;
//! callers resolve a name into a [`LayoutSpec`] and pass it in.

use crate::error::ConfigurationError;
use crate::layout::LayoutSpec;

/// A named grid of channel indices.
#[derive(Debug, Clone, Copy)]
pub struct LayoutPreset {
    /// Preset name as used on the command line and in config files
    pub name: &'static str,
    /// Short human-readable description
    pub description: &'static str,
    /// Rows of channel indices
    pub rows: &'static [&'static [usize]],
}

/// Built-in layouts
pub const PRESETS: &[LayoutPreset] = &[
    LayoutPreset {
        name: "3x4_1",
        description: "3 rows x 4 columns plus a lead II rhythm strip",
        rows: &[&[0, 3, 6, 9], &[1, 4, 7, 10], &[2, 5, 8, 11], &[1]],
    },
    LayoutPreset {
        name: "3x4",
        description: "3 rows x 4 columns",
        rows: &[&[0, 3, 6, 9], &[1, 4, 7, 10], &[2, 5, 8, 11]],
    },
    LayoutPreset {
        name: "6x2",
        description: "6 rows x 2 columns",
        rows: &[&[0, 6], &[1, 7], &[2, 8], &[3, 9], &[4, 10], &[5, 11]],
    },
    LayoutPreset {
        name: "12x1",
        description: "one full-length row per lead",
        rows: &[
            &[0],
            &[1],
            &[2],
            &[3],
            &[4],
            &[5],
            &[6],
            &[7],
            &[8],
            &[9],
            &[10],
            &[11],
        ],
    },
];

/// Helper to find a preset by name
pub fn find_preset(name: &str) -> Option<&'static LayoutPreset> {
    PRESETS.iter().find(|p| p.name == name)
}

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|p| p.name)
}

impl LayoutPreset {
    pub fn to_spec(&self) -> LayoutSpec {
        LayoutSpec::new(self.rows.iter().map(|row| row.to_vec()).collect())
    }
}

impl LayoutSpec {
    /// Resolve a built-in preset by name.
    pub fn from_preset(name: &str) -> Result<Self, ConfigurationError> {
        find_preset(name)
            .map(LayoutPreset::to_spec)
            .ok_or_else(|| ConfigurationError::UnknownPreset {
                name: name.to_string(),
            })
    }
}
