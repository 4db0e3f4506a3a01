use ecg_waveform::calibrate::ChannelCalibration;
use ecg_waveform::container::{ChannelDefinition, Signal};
use ecg_waveform::decoder::decode;
use ecg_waveform::error::ConfigurationError;
use ecg_waveform::layout::{LayoutEngine, LayoutSpec};
use ecg_waveform::test_fixtures::container_from_channels;
use proptest::prelude::*;

fn channels_strategy() -> impl Strategy<Value = Vec<Vec<i16>>> {
    (1usize..6, 1usize..64).prop_flat_map(|(channels, samples)| {
        prop::collection::vec(prop::collection::vec(any::<i16>(), samples), channels)
    })
}

fn flat_signals(channels: usize, samples: usize) -> Vec<Signal> {
    (0..channels).map(|_| Signal::new(vec![0.0; samples], None)).collect()
}

proptest! {
    #[test]
    fn decode_recovers_every_sample(channels in channels_strategy()) {
        let container = container_from_channels(&channels);
        let decoded = decode(&container).unwrap();

        prop_assert_eq!(decoded.channel_count(), channels.len());
        for (i, expected) in channels.iter().enumerate() {
            prop_assert_eq!(decoded.channel(i).unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn truncated_data_is_rejected(channels in channels_strategy(), cut in 1usize..4) {
        let mut container = container_from_channels(&channels);
        let len = container.raw_data.len();
        let keep = len.saturating_sub(cut);
        container.raw_data = container.raw_data[..keep].into();

        prop_assert!(decode(&container).is_err());
    }

    #[test]
    fn calibration_is_affine(
        raw in any::<i16>(),
        baseline in -100.0f64..100.0,
        sensitivity in 0.1f64..10.0,
    ) {
        let mut definition = ChannelDefinition::unity("uV");
        definition.sensitivity = Some(sensitivity);
        definition.sensitivity_correction_factor = Some(1.0);
        definition.baseline = Some(baseline);

        let micro = ChannelCalibration::from_definition(0, &definition).unwrap();
        definition.unit = "mV".to_string();
        let milli = ChannelCalibration::from_definition(0, &definition).unwrap();

        let expected = (raw as f64 + baseline) * sensitivity;
        prop_assert!((milli.apply(raw) - expected).abs() < 1e-9);
        prop_assert!((micro.apply(raw) * 1000.0 - expected).abs() < 1e-6);
    }

    #[test]
    fn windows_partition_each_row(
        rows in prop::collection::vec(prop::collection::vec(0usize..4, 1..8), 1..6),
        samples in 8usize..600,
    ) {
        let spec = LayoutSpec::new(rows.clone());
        let cells = LayoutEngine::default()
            .compute(&spec, &flat_signals(4, samples))
            .unwrap();
        prop_assert_eq!(cells.len(), spec.cell_count());

        for (row_index, row) in rows.iter().enumerate() {
            let row_cells: Vec<_> = cells.iter().filter(|c| c.row_index == row_index).collect();
            let chunk = samples / row.len();

            let mut next_start = 0;
            for (column, cell) in row_cells.iter().enumerate() {
                prop_assert_eq!(cell.column_index, column);
                prop_assert_eq!(cell.channel_index, row[column]);
                prop_assert_eq!(cell.sample_window.start, next_start);
                prop_assert_eq!(cell.sample_window.len(), chunk);
                next_start = cell.sample_window.end;
            }

            prop_assert!(next_start <= samples);
            prop_assert!(samples - next_start < row.len());
        }
    }

    #[test]
    fn vertical_offsets_descend_on_grid(rows in 2usize..=12) {
        let engine = LayoutEngine::default();
        let offsets: Vec<f64> = (0..rows).map(|r| engine.vertical_offset(r, rows)).collect();

        for pair in offsets.windows(2) {
            prop_assert!(pair[0] > pair[1], "{:?}", offsets);
        }
        for offset in &offsets {
            prop_assert_eq!(offset.rem_euclid(5.0), 0.0);
        }
    }

    #[test]
    fn out_of_range_channel_fails(channel_count in 1usize..12, extra in 0usize..5) {
        let spec = LayoutSpec::new(vec![vec![0, channel_count + extra]]);
        let result = LayoutEngine::default().compute(&spec, &flat_signals(channel_count, 32));

        let is_out_of_range = matches!(result, Err(ConfigurationError::ChannelOutOfRange { .. }));
        prop_assert!(is_out_of_range);
    }
}
