//! ecgplot: render multi-lead ECG recordings onto a printable grid
//!
//! # Usage
//!
//! ```bash
//! # Render one recording with the default 3x4 + rhythm layout
//! ecgplot render --manifest rec.toml --output rec.png
//!
//! # Pick another layout
//! ecgplot render --manifest rec.toml --output rec.png --layout 6x2
//!
//! # Render every manifest in a directory
//! ecgplot batch --input "recordings/*.toml" --output-dir sheets/
//!
//! # List layouts
//! ecgplot presets
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecg_waveform::batch::{pipeline_from_config, render_file, run_batch_processing, BatchArgs};
use ecg_waveform::presets::PRESETS;
use ecg_waveform::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecgplot")]
#[command(about = "Decode, filter and lay out multi-lead ECG waveforms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config TOML (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the sampling rate assumed by the filter, in Hz
    #[arg(long, global = true)]
    sampling_rate: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single recording
    Render {
        /// Recording manifest (TOML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output image path (.png or .jpg)
        #[arg(short, long)]
        output: PathBuf,

        /// Layout preset or custom layout name
        #[arg(short, long)]
        layout: Option<String>,
    },

    /// Render every manifest matching a glob pattern
    Batch {
        /// Glob pattern for manifests
        #[arg(short, long)]
        input: String,

        /// Directory for rendered sheets
        #[arg(short = 'd', long)]
        output_dir: PathBuf,

        /// Layout preset or custom layout name
        #[arg(short, long)]
        layout: Option<String>,
    },

    /// List built-in layout presets
    Presets,

    /// Write a default config file
    InitConfig {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path).context("Failed to load config")?,
        None => AppConfig::load_or_default(AppConfig::default_path()),
    };
    if let Some(rate) = cli.sampling_rate {
        config.filter = config.filter.with_sampling_rate(rate);
    }
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Render {
            manifest,
            output,
            layout,
        } => {
            let pipeline = pipeline_from_config(&config);
            let rendered = render_file(
                &manifest,
                &output,
                layout.as_deref(),
                &config,
                &pipeline,
                None,
            )?;
            tracing::info!(
                image = %rendered.image_path.display(),
                text = %rendered.text_path.display(),
                cells = rendered.cells,
                "Rendered sheet"
            );
        }
        Commands::Batch {
            input,
            output_dir,
            layout,
        } => {
            run_batch_processing(
                BatchArgs {
                    input_pattern: input,
                    output_dir,
                    layout,
                },
                &config,
            )?;
        }
        Commands::Presets => {
            for preset in PRESETS {
                println!("{:<8} {}", preset.name, preset.description);
            }
            for name in config.layout.custom.keys() {
                println!("{:<8} (custom)", name);
            }
        }
        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(AppConfig::default_path);
            AppConfig::default()
                .save_to_file(&path)
                .context("Failed to write config")?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}
