use crate::config::AppConfig;
use crate::legend::compose_legend;
use crate::metrics::{MetricsSummary, PipelineMetrics, StageTimings};
use crate::pipeline::EcgPipeline;
use crate::render::render_sheet;
use crate::source::RecordingManifest;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BatchArgs {
    pub input_pattern: String,
    pub output_dir: PathBuf,
    pub layout: Option<String>,
}

/// Files written for one rendered recording.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image_path: PathBuf,
    pub text_path: PathBuf,
    pub cells: usize,
}

/// Build the pipeline described by `config`.
pub fn pipeline_from_config(config: &AppConfig) -> EcgPipeline {
    EcgPipeline::new(config.filter, config.paper.layout_engine())
        .with_parallel_channels(config.processing.parallel_channels)
}

/// Render every manifest matching the input pattern.
///
/// Per-file failures are logged and counted; the batch itself only fails
/// when the output directory or the pattern is unusable.
pub fn run_batch_processing(args: BatchArgs, config: &AppConfig) -> Result<MetricsSummary> {
    tracing::info!("Starting batch processing");
    tracing::info!("Input pattern: {}", args.input_pattern);
    tracing::info!("Output directory: {:?}", args.output_dir);

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let mut metrics = PipelineMetrics::with_bounds(
        config.metrics.histogram_max_us,
        config.metrics.histogram_precision,
    );
    let mut failures = 0usize;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&args.input_pattern).context("Failed to read glob pattern")? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => {
                tracing::error!("Unreadable path {:?}: {}", e.path(), e.error());
                metrics.record_failure();
                failures += 1;
            }
        }
    }

    if paths.is_empty() && failures == 0 {
        tracing::warn!("No files found matching pattern: {}", args.input_pattern);
        return Ok(metrics.summary());
    }

    tracing::info!("Found {} manifests to process", paths.len());

    let pipeline = pipeline_from_config(config);

    for path in paths {
        tracing::info!("Processing manifest: {:?}", path);

        let output_path = match output_image_path(&path, &args.output_dir) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Skipping {:?}: {}", path, e);
                metrics.record_failure();
                failures += 1;
                continue;
            }
        };

        match render_file(
            &path,
            &output_path,
            args.layout.as_deref(),
            config,
            &pipeline,
            Some(&mut metrics),
        ) {
            Ok(output) => tracing::info!(cells = output.cells, "Successfully rendered {:?}", path),
            Err(e) => {
                failures += 1;
                tracing::error!("Failed to process {:?}: {:#}", path, e)
            }
        }
    }

    if config.metrics.enabled {
        metrics.summary().log();
    }

    tracing::info!(failures, "Batch processing complete");
    Ok(metrics.summary())
}

/// `<output_dir>/<stem>.png` for an input manifest.
pub fn output_image_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_stem = input_path
        .file_stem()
        .ok_or_else(|| anyhow::anyhow!("Invalid filename: {:?} has no stem", input_path))?;

    // Ensure stem is not empty to prevent ".png" overwrites
    if file_stem.is_empty() {
        anyhow::bail!("Invalid filename: {:?} has empty stem", input_path);
    }

    Ok(output_dir.join(PathBuf::from(file_stem).with_extension("png")))
}

/// Load, process, lay out and rasterize one manifest.
///
/// Writes the sheet image to `output_path` and the header/legend text next
/// to it with a `.txt` extension. When `metrics` is given, every call is
/// recorded as either a successful run or a failure.
pub fn render_file(
    manifest_path: &Path,
    output_path: &Path,
    layout: Option<&str>,
    config: &AppConfig,
    pipeline: &EcgPipeline,
    metrics: Option<&mut PipelineMetrics>,
) -> Result<RenderOutput> {
    let result = render_recording(manifest_path, output_path, layout, config, pipeline);

    if let Some(metrics) = metrics {
        match &result {
            Ok((_, run)) => metrics.record_run(&run.timings, run.samples, true),
            Err(_) => metrics.record_failure(),
        }
    }

    result.map(|(output, _)| output)
}

/// Stage timings and sample total of a completed render
struct RenderRun {
    timings: StageTimings,
    samples: usize,
}

fn render_recording(
    manifest_path: &Path,
    output_path: &Path,
    layout: Option<&str>,
    config: &AppConfig,
    pipeline: &EcgPipeline,
) -> Result<(RenderOutput, RenderRun)> {
    let loaded = RecordingManifest::load(manifest_path).context("Failed to load manifest")?;
    let source = loaded.data_source();
    let patient = loaded.manifest.patient.clone();
    let measurements = loaded.manifest.measurements.clone();

    if let Some(rate) = loaded.manifest.sampling_frequency_hz {
        if (rate - pipeline.filter_spec().sampling_rate_hz).abs() > f64::EPSILON {
            tracing::warn!(
                recorded_hz = rate,
                assumed_hz = pipeline.filter_spec().sampling_rate_hz,
                "Recording rate differs from filter sampling rate"
            );
        }
    }

    let (container, definitions) = loaded
        .manifest
        .into_container(&source)
        .context("Failed to read waveform data")?;

    let spec = config
        .layout
        .resolve(layout)
        .context("Failed to resolve layout")?;

    let mut recording = pipeline
        .process(&container, &definitions)
        .context("Failed to process waveform")?;
    let cells = pipeline
        .layout(&mut recording, &spec)
        .context("Failed to lay out waveform")?;

    let image = render_sheet(&cells, &recording.signals, &config.paper, &config.render);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    image.save(output_path).context("Failed to save image")?;

    let mut text = String::new();
    if let Some(patient) = patient {
        text.push_str(&patient.identity_line());
        text.push('\n');
        if let Some(date) = patient.date_line() {
            text.push_str(&date);
            text.push('\n');
        }
    }
    let legend = compose_legend(&measurements);
    if !legend.is_empty() {
        text.push_str(&legend);
        text.push('\n');
    }
    for cell in &cells {
        if let Some(label) = &cell.label {
            text.push_str(&format!(
                "row {} col {}: {} [{}..{})\n",
                cell.row_index,
                cell.column_index,
                label,
                cell.sample_window.start,
                cell.sample_window.end
            ));
        }
    }

    let text_path = output_path.with_extension("txt");
    fs::write(&text_path, text).context("Failed to write legend")?;

    let output = RenderOutput {
        image_path: output_path.to_path_buf(),
        text_path,
        cells: cells.len(),
    };
    let run = RenderRun {
        timings: recording.timings,
        samples: recording.sample_count * recording.channel_count(),
    };
    Ok((output, run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{generate_sine_channel, temp_recording, twelve_lead_definitions};

    #[test]
    fn test_output_image_path() {
        let out = output_image_path(Path::new("/data/rec01.toml"), Path::new("/out")).unwrap();
        assert_eq!(out, PathBuf::from("/out/rec01.png"));
    }

    #[test]
    fn test_output_image_path_requires_stem() {
        assert!(output_image_path(Path::new("/"), Path::new("/out")).is_err());
    }

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.render.pixels_per_mm = 1.0;
        config
    }

    #[test]
    fn test_missing_manifest_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config();
        let mut metrics = PipelineMetrics::new();

        let result = render_file(
            &dir.path().join("absent.toml"),
            &dir.path().join("absent.png"),
            None,
            &config,
            &pipeline_from_config(&config),
            Some(&mut metrics),
        );

        assert!(result.is_err());
        let summary = metrics.summary();
        assert_eq!(summary.total_runs, 1);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_unknown_layout_counts_as_failure() {
        let channels = vec![generate_sine_channel(5.0, 400, 1000.0, 300.0); 12];
        let (dir, manifest) = temp_recording(&channels, &twelve_lead_definitions()).unwrap();
        let config = small_config();
        let pipeline = pipeline_from_config(&config);
        let mut metrics = PipelineMetrics::new();

        let failed = render_file(
            &manifest,
            &dir.path().join("a.png"),
            Some("nope"),
            &config,
            &pipeline,
            Some(&mut metrics),
        );
        assert!(failed.is_err());

        render_file(
            &manifest,
            &dir.path().join("b.png"),
            Some("12x1"),
            &config,
            &pipeline,
            Some(&mut metrics),
        )
        .unwrap();

        let summary = metrics.summary();
        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.success_rate, 0.5);
        assert_eq!(summary.total_samples, 12 * 400);
    }
}
