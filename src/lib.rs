// Library interface for the ECG waveform pipeline

pub mod batch;
pub mod calibrate;
pub mod config;
pub mod container;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod layout;
pub mod legend;
pub mod metrics;
pub mod pipeline;
pub mod presets;
pub mod render;
pub mod source;

// Test fixtures for synthetic waveform generation
pub mod test_fixtures;

// Re-export commonly used types
pub use config::AppConfig;
pub use container::{ChannelDefinition, Signal, WaveformContainer};
pub use error::{ConfigurationError, EcgError, FormatError, Result};
pub use filter::FilterSpec;
pub use layout::{LayoutCell, LayoutEngine, LayoutSpec};
pub use pipeline::{EcgPipeline, ProcessedRecording};
