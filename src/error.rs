//! Error types for the ECG waveform pipeline.
//!
//! Every stage validates its input before transforming it, so a returned
//! error always means no partial output was produced. Nothing here is
//! transient: format and configuration errors are never retried.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum EcgError {
    /// Malformed or unsupported waveform container
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Invalid filter or layout configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Settings file errors
    #[error("Config file error: {0}")]
    ConfigFile(#[from] ConfigFileError),

    /// Byte source or manifest errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural problems with the waveform container or channel metadata.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Unsupported bits allocated: {bits} (only 16-bit samples supported)")]
    UnsupportedBitsAllocated { bits: u16 },

    #[error("Unsupported bits stored: {bits} (only 16-bit samples supported)")]
    UnsupportedBitsStored { bits: u16 },

    #[error("Unsupported sample interpretation '{found}' (expected signed 16-bit 'SS')")]
    UnsupportedInterpretation { found: String },

    #[error("Empty container: {channels} channels x {samples} samples")]
    EmptyContainer { channels: usize, samples: usize },

    #[error("Declared size overflows: {channels} channels x {samples} samples")]
    SizeOverflow { channels: usize, samples: usize },

    #[error("Waveform data length mismatch: expected {expected} bytes, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Channel definition count mismatch: expected {expected}, found {found}")]
    ChannelDefinitionCount { expected: usize, found: usize },

    #[error("Channel {channel}: sensitivity and correction factor must both be present or both absent")]
    PartialSensitivity { channel: usize },

    #[error("Channel {channel}: unrecognized unit '{unit}'")]
    UnknownUnit { channel: usize, unit: String },
}

/// Invalid filter or layout parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid sampling rate: {rate} Hz (must be positive and finite)")]
    InvalidSamplingRate { rate: f64 },

    #[error("Invalid filter order: {order} (must be 1-{max})")]
    InvalidOrder { order: u32, max: u32 },

    #[error("Invalid cutoffs: need 0 < low ({low} Hz) < high ({high} Hz) < Nyquist ({nyquist} Hz)")]
    InvalidCutoffs { low: f64, high: f64, nyquist: f64 },

    #[error("Layout has no rows")]
    EmptyLayout,

    #[error("Layout row {row} has no columns")]
    EmptyRow { row: usize },

    #[error("Layout cell ({row}, {column}) references channel {channel}, but only {channel_count} channels exist")]
    ChannelOutOfRange {
        row: usize,
        column: usize,
        channel: usize,
        channel_count: usize,
    },

    #[error("Layout row {row} has {columns} columns but signals only have {samples} samples")]
    ColumnsExceedSamples {
        row: usize,
        columns: usize,
        samples: usize,
    },

    #[error("Signals have inconsistent lengths: channel {channel} has {found} samples, expected {expected}")]
    InconsistentSignals {
        channel: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown layout preset '{name}'")]
    UnknownPreset { name: String },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("Failed to load config file '{path}': {source}")]
    LoadFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Invalid config format in '{path}': {source}")]
    InvalidFormat {
        path: Box<PathBuf>,
        source: toml::de::Error,
    },

    #[error("Config validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to save config to '{path}': {source}")]
    SaveFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Config serialization failed: {source}")]
    SerializationFailed { source: toml::ser::Error },
}

/// Byte source and recording manifest errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Invalid manifest '{path}': {source}")]
    InvalidManifest {
        path: Box<PathBuf>,
        source: toml::de::Error,
    },

    #[error("Manifest declares {declared} channels but lists {listed} channel definitions")]
    ChannelListMismatch { declared: usize, listed: usize },
}

/// Result type alias for pipeline operations
pub type Result<T, E = EcgError> = std::result::Result<T, E>;

impl EcgError {
    /// Structural and configuration failures abort the invocation outright.
    pub fn is_fatal(&self) -> bool {
        match self {
            EcgError::Format(_) | EcgError::Configuration(_) => true,
            EcgError::ConfigFile(_) | EcgError::Source(_) | EcgError::Io(_) => false,
        }
    }
}

impl FormatError {
    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            FormatError::UnsupportedBitsAllocated { bits }
            | FormatError::UnsupportedBitsStored { bits } => {
                format!("Recording uses {}-bit samples; only 16-bit is supported", bits)
            }
            FormatError::UnsupportedInterpretation { found } => {
                format!("Recording sample format '{}' is not supported", found)
            }
            FormatError::EmptyContainer { .. } => "Recording contains no samples".to_string(),
            FormatError::SizeOverflow { .. } => {
                "Recording declares an impossibly large sample count".to_string()
            }
            FormatError::LengthMismatch { .. } => {
                "Recording sample data is truncated or corrupt".to_string()
            }
            FormatError::ChannelDefinitionCount { .. } => {
                "Recording channel metadata does not match its sample data".to_string()
            }
            FormatError::PartialSensitivity { channel } => {
                format!("Channel {} has incomplete calibration metadata", channel)
            }
            FormatError::UnknownUnit { unit, .. } => {
                format!("Recording uses unsupported unit '{}'", unit)
            }
        }
    }
}

impl ConfigurationError {
    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> Option<String> {
        let hint = match self {
            ConfigurationError::InvalidCutoffs { .. } => {
                "Choose cutoffs with 0 < low < high < half the sampling rate".to_string()
            }
            ConfigurationError::InvalidOrder { max, .. } => {
                format!("Use a filter order between 1 and {}", max)
            }
            ConfigurationError::ChannelOutOfRange { .. } => {
                "Pick a layout that only references channels present in the recording".to_string()
            }
            ConfigurationError::UnknownPreset { .. } => {
                "Run `ecgplot presets` to list available layouts".to_string()
            }
            _ => return None,
        };
        Some(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormatError::LengthMismatch {
            expected: 40,
            actual: 38,
        };
        assert!(err.to_string().contains("40"));
        assert!(err.to_string().contains("38"));
    }

    #[test]
    fn test_fatal_errors() {
        let fatal: EcgError = FormatError::UnsupportedBitsAllocated { bits: 8 }.into();
        assert!(fatal.is_fatal());

        let fatal: EcgError = ConfigurationError::EmptyLayout.into();
        assert!(fatal.is_fatal());

        let io: EcgError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_user_messages() {
        let err = FormatError::UnknownUnit {
            channel: 2,
            unit: "nV".to_string(),
        };
        let msg = err.user_message();
        assert!(msg.contains("nV"));
        assert!(!msg.contains("Error"));
    }

    #[test]
    fn test_recovery_hints() {
        let err = ConfigurationError::InvalidCutoffs {
            low: 50.0,
            high: 40.0,
            nyquist: 500.0,
        };
        assert!(err.recovery_hint().unwrap().contains("low < high"));
        assert!(ConfigurationError::EmptyLayout.recovery_hint().is_none());
    }

    #[test]
    fn test_order_hint_tracks_limit() {
        let spec = crate::filter::FilterSpec {
            order: crate::filter::MAX_ORDER + 1,
            ..crate::filter::FilterSpec::default()
        };
        let err = spec.validate().unwrap_err();

        let hint = err.recovery_hint().unwrap();
        assert!(hint.ends_with(&format!("between 1 and {}", crate::filter::MAX_ORDER)));
    }
}
