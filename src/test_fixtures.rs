//! Synthetic waveform fixtures for development and testing
//!
//! Builds containers with known contents so tests don't need recorded
//! ECG files in the repository.

use crate::container::{ChannelDefinition, SampleInterpretation, WaveformContainer};
use std::f64::consts::PI;
use std::sync::Arc;

/// Interleave per-channel samples into little-endian frames.
///
/// All channels must have the same length.
///
/// # Example
/// ```
/// use ecg_waveform::test_fixtures::interleave_le;
/// let bytes = interleave_le(&[vec![1, 2], vec![-1, -2]]);
/// assert_eq!(bytes.len(), 8);
/// assert_eq!(&bytes[..4], &[1, 0, 0xff, 0xff]);
/// ```
pub fn interleave_le(channels: &[Vec<i16>]) -> Vec<u8> {
    let samples = channels.first().map_or(0, Vec::len);
    let mut bytes = Vec::with_capacity(2 * channels.len() * samples);
    for i in 0..samples {
        for channel in channels {
            bytes.extend_from_slice(&channel[i].to_le_bytes());
        }
    }
    bytes
}

/// Well-formed signed 16-bit container holding exactly these samples.
pub fn container_from_channels(channels: &[Vec<i16>]) -> WaveformContainer {
    WaveformContainer {
        channel_count: channels.len(),
        sample_count: channels.first().map_or(0, Vec::len),
        bits_allocated: 16,
        bits_stored: 16,
        sample_interpretation: SampleInterpretation::SignedShort,
        raw_data: Arc::from(interleave_le(channels)),
    }
}

/// Every channel holds the same constant value.
pub fn dc_container(channels: usize, samples: usize, value: i16) -> WaveformContainer {
    container_from_channels(&vec![vec![value; samples]; channels])
}

/// Quantized sine wave in raw integer units.
///
/// # Example
/// ```
/// use ecg_waveform::test_fixtures::generate_sine_channel;
/// // One second of 10 Hz at 1000 Hz sampling
/// let tone = generate_sine_channel(10.0, 1000, 1000.0, 500.0);
/// assert_eq!(tone.len(), 1000);
/// ```
pub fn generate_sine_channel(
    frequency_hz: f64,
    samples: usize,
    sampling_rate_hz: f64,
    amplitude: f64,
) -> Vec<i16> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / sampling_rate_hz;
            (amplitude * (2.0 * PI * frequency_hz * t).sin())
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

/// Sine riding on a slow baseline wander, the typical input for the band-pass.
pub fn generate_wandering_sine(
    samples: usize,
    sampling_rate_hz: f64,
    amplitude: f64,
    offset: f64,
) -> Vec<i16> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / sampling_rate_hz;
            let wander = offset + 0.5 * offset * (2.0 * PI * 0.01 * t).sin();
            (wander + amplitude * (2.0 * PI * 10.0 * t).sin())
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

/// Standard 12-lead channel definitions in microvolts with source labels.
pub fn twelve_lead_definitions() -> Vec<ChannelDefinition> {
    [
        "Lead I (Einthoven)",
        "Lead II",
        "Lead III",
        "Lead aVR",
        "Lead aVL",
        "Lead aVF",
        "Lead V1",
        "Lead V2",
        "Lead V3",
        "Lead V4",
        "Lead V5",
        "Lead V6",
    ]
    .iter()
    .map(|label| ChannelDefinition {
        sensitivity: Some(2.5),
        sensitivity_correction_factor: Some(1.0),
        baseline: Some(0.0),
        unit: "uV".to_string(),
        source_label: Some(label.to_string()),
    })
    .collect()
}

/// Write a manifest plus raw data file into `dir`, returning the manifest path.
pub fn write_manifest(
    dir: &std::path::Path,
    stem: &str,
    channels: &[Vec<i16>],
    definitions: &[ChannelDefinition],
) -> std::io::Result<std::path::PathBuf> {
    use crate::source::RecordingManifest;

    let data_name = format!("{}.bin", stem);
    std::fs::write(dir.join(&data_name), interleave_le(channels))?;

    let manifest = RecordingManifest {
        data: data_name.into(),
        channel_count: channels.len(),
        sample_count: channels.first().map_or(0, Vec::len),
        bits_allocated: 16,
        bits_stored: 16,
        sample_interpretation: "SS".to_string(),
        sampling_frequency_hz: Some(1000.0),
        channels: definitions.to_vec(),
        patient: None,
        measurements: Default::default(),
    };
    let text = toml::to_string(&manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let path = dir.join(format!("{}.toml", stem));
    std::fs::write(&path, text)?;
    Ok(path)
}

/// Write a recording into a fresh temporary directory.
///
/// The directory is removed when the returned guard drops, so keep it alive
/// for as long as the manifest is in use.
pub fn temp_recording(
    channels: &[Vec<i16>],
    definitions: &[ChannelDefinition],
) -> std::io::Result<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = write_manifest(dir.path(), "recording", channels, definitions)?;
    Ok((dir, path))
}
