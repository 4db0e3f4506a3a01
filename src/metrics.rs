//! Per-stage pipeline latency metrics.
//!
//! Uses HDR histograms for accurate latency percentiles.

use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Wall-clock time spent in each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub decode: Duration,
    pub calibrate: Duration,
    pub filter: Duration,
    pub layout: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.decode + self.calibrate + self.filter + self.layout
    }
}

/// Pipeline-wide metrics
#[derive(Debug)]
pub struct PipelineMetrics {
    decode_us: Histogram<u64>,
    calibrate_us: Histogram<u64>,
    filter_us: Histogram<u64>,
    layout_us: Histogram<u64>,

    /// Total pipeline invocations
    total_runs: AtomicU64,

    /// Invocations that produced output
    total_success: AtomicU64,

    /// Samples processed across all channels
    total_samples: AtomicU64,

    started: Instant,
}

/// Latency percentiles for one stage, in microseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct StageSummary {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// Summary of key metrics for display
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub decode: StageSummary,
    pub calibrate: StageSummary,
    pub filter: StageSummary,
    pub layout: StageSummary,

    pub total_runs: u64,

    /// Success rate (0.0-1.0)
    pub success_rate: f64,

    pub total_samples: u64,

    pub uptime_secs: f64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Histograms covering 1us to one minute with 2 significant digits
    pub fn new() -> Self {
        Self::with_bounds(60_000_000, 2)
    }

    pub fn with_bounds(max_us: u64, precision: u8) -> Self {
        let histogram = || {
            Histogram::new_with_bounds(1, max_us.max(2), precision.min(5))
                .expect("Histogram creation should succeed")
        };

        Self {
            decode_us: histogram(),
            calibrate_us: histogram(),
            filter_us: histogram(),
            layout_us: histogram(),
            total_runs: AtomicU64::new(0),
            total_success: AtomicU64::new(0),
            total_samples: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Record one pipeline invocation
    pub fn record_run(&mut self, timings: &StageTimings, samples: usize, success: bool) {
        let stages = [
            (&mut self.decode_us, timings.decode),
            (&mut self.calibrate_us, timings.calibrate),
            (&mut self.filter_us, timings.filter),
            (&mut self.layout_us, timings.layout),
        ];
        for (histogram, duration) in stages {
            let us = (duration.as_micros() as u64).max(1);
            if let Err(e) = histogram.record(us) {
                tracing::warn!("Failed to record stage latency: {}", e);
            }
        }

        self.total_runs.fetch_add(1, Ordering::Relaxed);
        if success {
            self.total_success.fetch_add(1, Ordering::Relaxed);
            self.total_samples
                .fetch_add(samples as u64, Ordering::Relaxed);
        }
    }

    /// Record a run that failed before any stage timing was available
    pub fn record_failure(&self) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics summary
    pub fn summary(&self) -> MetricsSummary {
        let total_runs = self.total_runs.load(Ordering::Relaxed);
        let total_success = self.total_success.load(Ordering::Relaxed);
        let success_rate = if total_runs > 0 {
            total_success as f64 / total_runs as f64
        } else {
            0.0
        };

        let stage = |h: &Histogram<u64>| StageSummary {
            p50_us: h.value_at_quantile(0.5),
            p95_us: h.value_at_quantile(0.95),
            p99_us: h.value_at_quantile(0.99),
        };

        MetricsSummary {
            decode: stage(&self.decode_us),
            calibrate: stage(&self.calibrate_us),
            filter: stage(&self.filter_us),
            layout: stage(&self.layout_us),
            total_runs,
            success_rate,
            total_samples: self.total_samples.load(Ordering::Relaxed),
            uptime_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.decode_us.clear();
        self.calibrate_us.clear();
        self.filter_us.clear();
        self.layout_us.clear();
        self.total_runs.store(0, Ordering::Relaxed);
        self.total_success.store(0, Ordering::Relaxed);
        self.total_samples.store(0, Ordering::Relaxed);
        self.started = Instant::now();
    }
}

impl MetricsSummary {
    /// Emit the summary as a structured log line
    pub fn log(&self) {
        tracing::info!(
            runs = self.total_runs,
            success_rate = self.success_rate,
            samples = self.total_samples,
            decode_p95_us = self.decode.p95_us,
            calibrate_p95_us = self.calibrate.p95_us,
            filter_p95_us = self.filter.p95_us,
            layout_p95_us = self.layout.p95_us,
            "Pipeline metrics"
        );
    }
}
