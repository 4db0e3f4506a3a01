//! In-memory waveform container and per-channel metadata.
//!
//! These values are materialized by whatever parses the source container
//! and are never mutated by the pipeline.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How raw sample words are to be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleInterpretation {
    /// Signed 16-bit integers ("SS")
    SignedShort,
    /// Anything else the container declared, kept verbatim for error reporting
    Other(String),
}

impl SampleInterpretation {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "SS" => SampleInterpretation::SignedShort,
            other => SampleInterpretation::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            SampleInterpretation::SignedShort => "SS",
            SampleInterpretation::Other(code) => code,
        }
    }
}

/// Immutable multi-channel waveform bundle.
///
/// `raw_data` holds little-endian sample words interleaved per time step:
/// sample 0 of every channel, then sample 1 of every channel, and so on.
#[derive(Debug, Clone)]
pub struct WaveformContainer {
    pub channel_count: usize,
    pub sample_count: usize,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub sample_interpretation: SampleInterpretation,
    /// Shared so several pipeline invocations can borrow the same bytes
    pub raw_data: Arc<[u8]>,
}

impl WaveformContainer {
    /// Byte length the raw buffer must have for 16-bit samples, or `None`
    /// if the declared dimensions overflow `usize`.
    pub fn expected_byte_len(&self) -> Option<usize> {
        self.channel_count
            .checked_mul(self.sample_count)?
            .checked_mul(2)
    }
}

/// Physical unit of a channel's calibrated amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Microvolt,
    Millivolt,
}

impl Unit {
    /// Parse a unit code value. Accepts the UCUM codes used by ECG containers.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "uV" | "µV" | "microvolt" => Some(Unit::Microvolt),
            "mV" | "millivolt" => Some(Unit::Millivolt),
            _ => None,
        }
    }

    /// Divisor that brings a value in this unit to millivolts.
    pub fn millivolt_divisor(self) -> f64 {
        match self {
            Unit::Microvolt => 1000.0,
            Unit::Millivolt => 1.0,
        }
    }
}

/// Calibration metadata for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub sensitivity: Option<f64>,
    pub sensitivity_correction_factor: Option<f64>,
    pub baseline: Option<f64>,
    /// Unit code as stored in the container, e.g. "uV"
    pub unit: String,
    /// Source description such as "Lead I (Einthoven)"
    #[serde(default)]
    pub source_label: Option<String>,
}

impl ChannelDefinition {
    /// Channel with unity gain, zero baseline and the given unit code.
    pub fn unity(unit: impl Into<String>) -> Self {
        Self {
            sensitivity: None,
            sensitivity_correction_factor: None,
            baseline: None,
            unit: unit.into(),
            source_label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }

    /// Combined multiplicative gain; both factors or neither must be present.
    pub fn gain(&self, channel: usize) -> Result<f64, FormatError> {
        match (self.sensitivity, self.sensitivity_correction_factor) {
            (Some(sensitivity), Some(correction)) => Ok(sensitivity * correction),
            (None, None) => Ok(1.0),
            _ => Err(FormatError::PartialSensitivity { channel }),
        }
    }

    pub fn baseline_or_zero(&self) -> f64 {
        self.baseline.unwrap_or(0.0)
    }

    pub fn parsed_unit(&self, channel: usize) -> Result<Unit, FormatError> {
        Unit::from_code(&self.unit).ok_or_else(|| FormatError::UnknownUnit {
            channel,
            unit: self.unit.clone(),
        })
    }
}

/// One channel's samples in millivolts.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f64>,
    source_label: Option<String>,
}

impl Signal {
    pub fn new(samples: Vec<f64>, source_label: Option<String>) -> Self {
        Self {
            samples,
            source_label,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }

    /// New signal carrying the same label over different samples.
    pub fn with_samples(&self, samples: Vec<f64>) -> Self {
        Self {
            samples,
            source_label: self.source_label.clone(),
        }
    }
}
