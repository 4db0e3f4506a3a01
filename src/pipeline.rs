use crate::calibrate::calibrate;
use crate::container::{ChannelDefinition, Signal, WaveformContainer};
use crate::decoder::decode;
use crate::error::Result;
use crate::filter::{filter_signals, CoefficientCache, FilterSpec};
use crate::layout::{LayoutCell, LayoutEngine, LayoutSpec};
use crate::metrics::StageTimings;
use std::sync::Mutex;
use std::time::Instant;

/// Calibrated, filtered channels in millivolts.
#[derive(Debug, Clone)]
pub struct ProcessedRecording {
    pub signals: Vec<Signal>,
    pub sample_count: usize,
    pub timings: StageTimings,
}

impl ProcessedRecording {
    pub fn channel_count(&self) -> usize {
        self.signals.len()
    }
}

/// Decode -> calibrate -> filter, then layout on demand.
///
/// Each invocation works on its own inputs; the only state kept between
/// calls is the coefficient cache, which never changes results.
pub struct EcgPipeline {
    filter: FilterSpec,
    engine: LayoutEngine,
    parallel: bool,
    cache: Mutex<CoefficientCache>,
}

impl EcgPipeline {
    pub fn new(filter: FilterSpec, engine: LayoutEngine) -> Self {
        Self {
            filter,
            engine,
            parallel: false,
            cache: Mutex::new(CoefficientCache::new()),
        }
    }

    /// Split calibration and filtering across one thread per channel.
    pub fn with_parallel_channels(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Run the signal stages over one container.
    ///
    /// The filter is designed (or fetched from cache) before decoding, so an
    /// invalid filter fails without touching the samples.
    pub fn process(
        &self,
        container: &WaveformContainer,
        definitions: &[ChannelDefinition],
    ) -> Result<ProcessedRecording> {
        let coefficients = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_or_design(&self.filter)?;

        let mut timings = StageTimings::default();

        let started = Instant::now();
        let decoded = decode(container)?;
        timings.decode = started.elapsed();

        let started = Instant::now();
        let calibrated = calibrate(&decoded, definitions, self.parallel)?;
        timings.calibrate = started.elapsed();

        let started = Instant::now();
        let signals = filter_signals(&coefficients, &calibrated, self.parallel);
        timings.filter = started.elapsed();

        tracing::info!(
            channels = signals.len(),
            samples = decoded.sample_count,
            elapsed_ms = timings.total().as_millis() as u64,
            "Processed waveform"
        );

        Ok(ProcessedRecording {
            signals,
            sample_count: decoded.sample_count,
            timings,
        })
    }

    /// Map a layout onto processed signals, recording the stage time.
    pub fn layout(
        &self,
        recording: &mut ProcessedRecording,
        spec: &LayoutSpec,
    ) -> Result<Vec<LayoutCell>> {
        let started = Instant::now();
        let cells = self.engine.compute(spec, &recording.signals)?;
        recording.timings.layout = started.elapsed();
        Ok(cells)
    }
}

impl Default for EcgPipeline {
    fn default() -> Self {
        Self::new(FilterSpec::default(), LayoutEngine::default())
    }
}
