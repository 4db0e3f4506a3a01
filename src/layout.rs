//! Grid layout of filtered channels onto a printed sheet.
//!
//! A [`LayoutSpec`] lists rows of channel indices. Each row is split into
//! equal time chunks, one per column, and centred in its own horizontal band
//! of the sheet. The engine is a pure function of its inputs; nothing is
//! cached between invocations.

use crate::container::Signal;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default vertical extent of the plot area, in millimetres
pub const DEFAULT_VERTICAL_EXTENT: f64 = 170.0;
/// Default snapping grid for row centres, in millimetres
pub const DEFAULT_GRID_QUANTUM: f64 = 5.0;

/// Rows of zero-based channel indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutSpec {
    rows: Vec<Vec<usize>>,
}

impl LayoutSpec {
    pub fn new(rows: Vec<Vec<usize>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Validate shape and channel bounds against `channel_count`.
    pub fn validate(&self, channel_count: usize) -> Result<(), ConfigurationError> {
        if self.rows.is_empty() {
            return Err(ConfigurationError::EmptyLayout);
        }

        for (row, channels) in self.rows.iter().enumerate() {
            if channels.is_empty() {
                return Err(ConfigurationError::EmptyRow { row });
            }
            if let Some((column, &channel)) = channels
                .iter()
                .enumerate()
                .find(|(_, channel)| **channel >= channel_count)
            {
                return Err(ConfigurationError::ChannelOutOfRange {
                    row,
                    column,
                    channel,
                    channel_count,
                });
            }
        }

        Ok(())
    }
}

/// Placement of one time segment of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCell {
    pub row_index: usize,
    pub column_index: usize,
    pub channel_index: usize,
    /// Half-open sample range into the channel
    pub sample_window: Range<usize>,
    /// Row centre on the vertical axis, snapped to the grid quantum
    pub vertical_offset: f64,
    /// Cell start on the horizontal axis, in sample units
    pub horizontal_offset: f64,
    /// Display label with decorative qualifiers removed
    pub label: Option<String>,
}

/// Strip "Lead" and "(Einthoven)" from a source description.
pub fn display_label(source: &str) -> String {
    source
        .replace("Lead", "")
        .replace("(Einthoven)", "")
        .trim()
        .to_string()
}

/// Geometry the engine lays rows into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutEngine {
    /// Total vertical extent `H` shared by all rows
    pub vertical_extent: f64,
    /// Row centres snap to multiples of this
    pub grid_quantum: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            vertical_extent: DEFAULT_VERTICAL_EXTENT,
            grid_quantum: DEFAULT_GRID_QUANTUM,
        }
    }
}

impl LayoutEngine {
    pub fn new(vertical_extent: f64, grid_quantum: f64) -> Self {
        Self {
            vertical_extent,
            grid_quantum,
        }
    }

    /// Centre of `row` among `rows` equal bands, snapped to the grid.
    ///
    /// The raw centre is rounded, biased by half a quantum and floored to a
    /// quantum multiple, so adjacent rows share gridlines.
    pub fn vertical_offset(&self, row: usize, rows: usize) -> f64 {
        let h = self.vertical_extent;
        let r = rows as f64;
        let raw = (h * (1.0 - 1.0 / (2.0 * r)) - row as f64 * (h / r)).round();
        let biased = raw + self.grid_quantum / 2.0;
        biased - biased.rem_euclid(self.grid_quantum)
    }

    /// Map every (row, column) pair to its sample window and placement.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for an empty layout or row, a channel
    /// index outside the signals, signals of unequal length, or a row with
    /// more columns than samples. No cells are produced on failure.
    pub fn compute(
        &self,
        spec: &LayoutSpec,
        signals: &[Signal],
    ) -> Result<Vec<LayoutCell>, ConfigurationError> {
        spec.validate(signals.len())?;

        let sample_count = signals.first().map_or(0, Signal::len);
        if let Some((channel, signal)) = signals
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() != sample_count)
        {
            return Err(ConfigurationError::InconsistentSignals {
                channel,
                expected: sample_count,
                found: signal.len(),
            });
        }

        if let Some((row, channels)) = spec
            .rows()
            .iter()
            .enumerate()
            .find(|(_, channels)| channels.len() > sample_count)
        {
            return Err(ConfigurationError::ColumnsExceedSamples {
                row,
                columns: channels.len(),
                samples: sample_count,
            });
        }

        let rows = spec.row_count();
        let mut cells = Vec::with_capacity(spec.cell_count());

        for (row_index, channels) in spec.rows().iter().enumerate() {
            let columns = channels.len();
            let chunk_size = sample_count / columns;
            let spacing = sample_count as f64 / columns as f64;
            let vertical_offset = self.vertical_offset(row_index, rows);

            for (column_index, &channel_index) in channels.iter().enumerate() {
                cells.push(LayoutCell {
                    row_index,
                    column_index,
                    channel_index,
                    sample_window: column_index * chunk_size..(column_index + 1) * chunk_size,
                    vertical_offset,
                    horizontal_offset: spacing * column_index as f64,
                    label: signals[channel_index].source_label().map(display_label),
                });
            }
        }

        tracing::debug!(rows, cells = cells.len(), sample_count, "Computed layout");

        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_signals(channels: usize, samples: usize) -> Vec<Signal> {
        (0..channels)
            .map(|ch| Signal::new(vec![0.0; samples], Some(format!("Lead {}", ch))))
            .collect()
    }

    #[test]
    fn test_single_cell() {
        let cells = LayoutEngine::default()
            .compute(&LayoutSpec::new(vec![vec![0]]), &flat_signals(2, 10))
            .unwrap();

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].sample_window, 0..10);
        assert_eq!(cells[0].horizontal_offset, 0.0);
        // 170 * 0.5 = 85, +2.5 = 87.5, floored to 85
        assert_eq!(cells[0].vertical_offset, 85.0);
    }

    #[test]
    fn test_chunks_truncate_remainder() {
        let spec = LayoutSpec::new(vec![vec![0, 1, 2]]);
        let cells = LayoutEngine::default()
            .compute(&spec, &flat_signals(3, 10))
            .unwrap();

        let windows: Vec<_> = cells.iter().map(|c| c.sample_window.clone()).collect();
        assert_eq!(windows, vec![0..3, 3..6, 6..9]);

        // Offsets keep the unrounded spacing
        assert!((cells[1].horizontal_offset - 10.0 / 3.0).abs() < 1e-12);
        assert!((cells[2].horizontal_offset - 20.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_four_row_offsets() {
        let engine = LayoutEngine::default();
        let offsets: Vec<f64> = (0..4).map(|r| engine.vertical_offset(r, 4)).collect();
        assert_eq!(offsets, vec![150.0, 105.0, 65.0, 20.0]);
    }

    #[test]
    fn test_three_row_offsets() {
        let engine = LayoutEngine::default();
        let offsets: Vec<f64> = (0..3).map(|r| engine.vertical_offset(r, 3)).collect();
        // raw centres 141.67, 85, 28.33
        assert_eq!(offsets, vec![140.0, 85.0, 30.0]);
    }

    #[test]
    fn test_out_of_range_channel() {
        let spec = LayoutSpec::new(vec![vec![0, 1], vec![2]]);
        let result = LayoutEngine::default().compute(&spec, &flat_signals(2, 10));
        assert_eq!(
            result,
            Err(ConfigurationError::ChannelOutOfRange {
                row: 1,
                column: 0,
                channel: 2,
                channel_count: 2
            })
        );
    }

    #[test]
    fn test_degenerate_layouts() {
        let engine = LayoutEngine::default();
        let signals = flat_signals(2, 10);

        assert_eq!(
            engine.compute(&LayoutSpec::new(vec![]), &signals),
            Err(ConfigurationError::EmptyLayout)
        );
        assert_eq!(
            engine.compute(&LayoutSpec::new(vec![vec![0], vec![]]), &signals),
            Err(ConfigurationError::EmptyRow { row: 1 })
        );
        assert!(matches!(
            engine.compute(&LayoutSpec::new(vec![vec![0; 11]]), &signals),
            Err(ConfigurationError::ColumnsExceedSamples { .. })
        ));
    }

    #[test]
    fn test_inconsistent_signal_lengths() {
        let signals = vec![Signal::new(vec![0.0; 10], None), Signal::new(vec![0.0; 9], None)];
        let result = LayoutEngine::default().compute(&LayoutSpec::new(vec![vec![0, 1]]), &signals);
        assert!(matches!(
            result,
            Err(ConfigurationError::InconsistentSignals { channel: 1, .. })
        ));
    }

    #[test]
    fn test_labels_stripped() {
        assert_eq!(display_label("Lead I (Einthoven)"), "I");
        assert_eq!(display_label("Lead aVR"), "aVR");
        assert_eq!(display_label("V1"), "V1");

        let signals = vec![
            Signal::new(vec![0.0; 4], Some("Lead II (Einthoven)".to_string())),
            Signal::new(vec![0.0; 4], None),
        ];
        let cells = LayoutEngine::default()
            .compute(&LayoutSpec::new(vec![vec![0, 1]]), &signals)
            .unwrap();
        assert_eq!(cells[0].label.as_deref(), Some("II"));
        assert_eq!(cells[1].label, None);
    }

    #[test]
    fn test_spec_deserializes_from_nested_arrays() {
        let spec: LayoutSpec = parse_toml_rows("[[0, 3], [1]]");
        assert_eq!(spec.rows(), &[vec![0, 3], vec![1]]);
    }

    fn parse_toml_rows(text: &str) -> LayoutSpec {
        #[derive(Deserialize)]
        struct Wrapper {
            rows: LayoutSpec,
        }
        let wrapper: Wrapper = toml::from_str(&format!("rows = {}", text)).unwrap();
        wrapper.rows
    }
}
