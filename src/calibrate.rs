//! Raw integer samples to millivolts.
//!
//! `mv = (raw + baseline) * sensitivity * correction / unit_divisor`, applied
//! per sample. Channels are independent, so the work can be split across
//! scoped threads.

use crate::container::{ChannelDefinition, Signal};
use crate::decoder::DecodedSamples;
use crate::error::FormatError;
use std::thread;

/// Per-channel linear calibration resolved from its definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    pub baseline: f64,
    pub gain: f64,
    pub millivolt_divisor: f64,
}

impl ChannelCalibration {
    pub fn from_definition(
        channel: usize,
        definition: &ChannelDefinition,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            baseline: definition.baseline_or_zero(),
            gain: definition.gain(channel)?,
            millivolt_divisor: definition.parsed_unit(channel)?.millivolt_divisor(),
        })
    }

    #[inline]
    pub fn apply(&self, raw: i16) -> f64 {
        (raw as f64 + self.baseline) * self.gain / self.millivolt_divisor
    }
}

/// Resolve every channel's calibration up front so failures surface before
/// any sample is touched.
pub fn resolve_calibrations(
    definitions: &[ChannelDefinition],
    channel_count: usize,
) -> Result<Vec<ChannelCalibration>, FormatError> {
    if definitions.len() != channel_count {
        return Err(FormatError::ChannelDefinitionCount {
            expected: channel_count,
            found: definitions.len(),
        });
    }

    definitions
        .iter()
        .enumerate()
        .map(|(channel, def)| ChannelCalibration::from_definition(channel, def))
        .collect()
}

/// Convert decoded channels into millivolt signals.
///
/// # Errors
///
/// Returns [`FormatError::ChannelDefinitionCount`] when the definitions do not
/// match the decoded channels, [`FormatError::PartialSensitivity`] for a
/// definition with only one of its gain factors, and
/// [`FormatError::UnknownUnit`] for a unit outside microvolt/millivolt.
pub fn calibrate(
    decoded: &DecodedSamples,
    definitions: &[ChannelDefinition],
    parallel: bool,
) -> Result<Vec<Signal>, FormatError> {
    let calibrations = resolve_calibrations(definitions, decoded.channel_count())?;

    let calibrate_channel = |index: usize| -> Signal {
        let calibration = calibrations[index];
        let samples = decoded.channels[index]
            .iter()
            .map(|&raw| calibration.apply(raw))
            .collect();
        Signal::new(samples, definitions[index].source_label.clone())
    };

    let signals = if parallel && decoded.channel_count() > 1 {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..decoded.channel_count())
                .map(|index| scope.spawn(move || calibrate_channel(index)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    } else {
        (0..decoded.channel_count()).map(calibrate_channel).collect()
    };

    tracing::debug!(channels = decoded.channel_count(), parallel, "Calibrated channels");

    Ok(signals)
}
