//! Byte providers and the recording manifest.
//!
//! Parsing the original waveform container is outside this crate. Callers
//! hand over the already-extracted metadata as a [`RecordingManifest`] and
//! the interleaved sample bytes through a [`ByteSource`].

use crate::container::{ChannelDefinition, SampleInterpretation, WaveformContainer};
use crate::error::SourceError;
use crate::legend::{Measurements, PatientHeader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Anything that can provide the raw bytes for a logical source.
pub trait ByteSource {
    fn provide(&self) -> Result<Vec<u8>, SourceError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Bytes read from a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ByteSource for FileSource {
    fn provide(&self) -> Result<Vec<u8>, SourceError> {
        std::fs::read(&self.path).map_err(|source| SourceError::ReadFailed {
            path: Box::new(self.path.clone()),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ByteSource for MemorySource {
    fn provide(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}

/// Container metadata as extracted from the source recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingManifest {
    /// Raw sample file, relative to the manifest
    pub data: PathBuf,
    pub channel_count: usize,
    pub sample_count: usize,
    #[serde(default = "default_bits")]
    pub bits_allocated: u16,
    #[serde(default = "default_bits")]
    pub bits_stored: u16,
    #[serde(default = "default_interpretation")]
    pub sample_interpretation: String,
    /// Acquisition rate when the recording states one
    #[serde(default)]
    pub sampling_frequency_hz: Option<f64>,
    pub channels: Vec<ChannelDefinition>,
    #[serde(default)]
    pub patient: Option<PatientHeader>,
    #[serde(default)]
    pub measurements: Measurements,
}

fn default_bits() -> u16 {
    16
}

fn default_interpretation() -> String {
    "SS".to_string()
}

/// Manifest together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: RecordingManifest,
    pub base_dir: PathBuf,
}

impl RecordingManifest {
    /// Load a manifest from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedManifest, SourceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SourceError::ReadFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })?;

        let manifest: RecordingManifest =
            toml::from_str(&contents).map_err(|source| SourceError::InvalidManifest {
                path: Box::new(path.to_path_buf()),
                source,
            })?;

        Ok(LoadedManifest {
            manifest,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }

    /// Materialize the container from `source` plus this metadata.
    pub fn into_container(
        self,
        source: &dyn ByteSource,
    ) -> Result<(WaveformContainer, Vec<ChannelDefinition>), SourceError> {
        if self.channels.len() != self.channel_count {
            return Err(SourceError::ChannelListMismatch {
                declared: self.channel_count,
                listed: self.channels.len(),
            });
        }

        let raw_data = source.provide()?;
        tracing::debug!(
            source = %source.describe(),
            bytes = raw_data.len(),
            "Loaded waveform bytes"
        );

        let container = WaveformContainer {
            channel_count: self.channel_count,
            sample_count: self.sample_count,
            bits_allocated: self.bits_allocated,
            bits_stored: self.bits_stored,
            sample_interpretation: SampleInterpretation::from_code(&self.sample_interpretation),
            raw_data: raw_data.into(),
        };

        Ok((container, self.channels))
    }
}

impl LoadedManifest {
    /// Source for the manifest's data file.
    pub fn data_source(&self) -> FileSource {
        FileSource::new(self.base_dir.join(&self.manifest.data))
    }
}
