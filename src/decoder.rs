use crate::container::{SampleInterpretation, WaveformContainer};
use crate::error::FormatError;

/// Raw integer samples split per channel, before any calibration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSamples {
    pub channels: Vec<Vec<i16>>,
    pub sample_count: usize,
}

impl DecodedSamples {
    pub fn channel(&self, index: usize) -> Option<&[i16]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Check that a container holds signed 16-bit samples of the declared size.
pub fn validate_container(container: &WaveformContainer) -> Result<(), FormatError> {
    if container.bits_allocated != 16 {
        return Err(FormatError::UnsupportedBitsAllocated {
            bits: container.bits_allocated,
        });
    }

    if container.bits_stored != 16 {
        return Err(FormatError::UnsupportedBitsStored {
            bits: container.bits_stored,
        });
    }

    if container.sample_interpretation != SampleInterpretation::SignedShort {
        return Err(FormatError::UnsupportedInterpretation {
            found: container.sample_interpretation.code().to_string(),
        });
    }

    if container.channel_count == 0 || container.sample_count == 0 {
        return Err(FormatError::EmptyContainer {
            channels: container.channel_count,
            samples: container.sample_count,
        });
    }

    let expected = container
        .expected_byte_len()
        .ok_or(FormatError::SizeOverflow {
            channels: container.channel_count,
            samples: container.sample_count,
        })?;
    if container.raw_data.len() != expected {
        return Err(FormatError::LengthMismatch {
            expected,
            actual: container.raw_data.len(),
        });
    }

    Ok(())
}

/// Unpack interleaved little-endian `i16` words into per-channel arrays.
///
/// # Errors
///
/// Returns a [`FormatError`] for any bit depth other than 16, a sample
/// interpretation other than signed, an empty container, or a byte buffer
/// whose length is not exactly `2 * channels * samples`.
pub fn decode(container: &WaveformContainer) -> Result<DecodedSamples, FormatError> {
    validate_container(container)?;

    let channel_count = container.channel_count;
    let mut channels: Vec<Vec<i16>> = (0..channel_count)
        .map(|_| Vec::with_capacity(container.sample_count))
        .collect();

    // One frame is a single time step across every channel
    for frame in container.raw_data.chunks_exact(2 * channel_count) {
        for (channel, word) in channels.iter_mut().zip(frame.chunks_exact(2)) {
            channel.push(i16::from_le_bytes([word[0], word[1]]));
        }
    }

    tracing::debug!(
        channels = channel_count,
        samples = container.sample_count,
        "Decoded waveform samples"
    );

    Ok(DecodedSamples {
        channels,
        sample_count: container.sample_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{container_from_channels, interleave_le};
    use std::sync::Arc;

    #[test]
    fn test_decode_extremes_two_channels() {
        let ch0 = vec![-32768, 0, 32767, -1];
        let ch1 = vec![1, -2, 3, i16::MIN];
        let container = container_from_channels(&[ch0.clone(), ch1.clone()]);

        let decoded = decode(&container).unwrap();

        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.sample_count, 4);
        assert_eq!(decoded.channel(0).unwrap(), ch0.as_slice());
        assert_eq!(decoded.channel(1).unwrap(), ch1.as_slice());
    }

    #[test]
    fn test_interleaving_order() {
        // Bytes for frame 0: ch0=0x0102, ch1=0x0304
        let bytes = interleave_le(&[vec![0x0102], vec![0x0304]]);
        assert_eq!(bytes, vec![0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn test_rejects_wrong_bit_depth() {
        let mut container = container_from_channels(&[vec![1, 2, 3]]);
        container.bits_allocated = 12;
        assert_eq!(
            decode(&container),
            Err(FormatError::UnsupportedBitsAllocated { bits: 12 })
        );
    }

    #[test]
    fn test_rejects_unsigned_interpretation() {
        let mut container = container_from_channels(&[vec![1, 2, 3]]);
        container.sample_interpretation = SampleInterpretation::from_code("US");
        assert!(matches!(
            decode(&container),
            Err(FormatError::UnsupportedInterpretation { .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_buffer() {
        let mut container = container_from_channels(&[vec![1, 2, 3], vec![4, 5, 6]]);
        let mut bytes = container.raw_data.to_vec();
        bytes.pop();
        container.raw_data = Arc::from(bytes);

        assert_eq!(
            decode(&container),
            Err(FormatError::LengthMismatch {
                expected: 12,
                actual: 11
            })
        );
    }

    #[test]
    fn test_rejects_overflowing_dimensions() {
        let mut container = container_from_channels(&[vec![1, 2]]);
        container.channel_count = usize::MAX / 2 + 1;
        container.sample_count = 1;

        assert_eq!(
            decode(&container),
            Err(FormatError::SizeOverflow {
                channels: usize::MAX / 2 + 1,
                samples: 1
            })
        );
    }

    #[test]
    fn test_rejects_empty_container() {
        let mut container = container_from_channels(&[vec![1]]);
        container.sample_count = 0;
        assert!(matches!(
            decode(&container),
            Err(FormatError::EmptyContainer { .. })
        ));
    }
}
