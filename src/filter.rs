//! Butterworth band-pass design and causal IIR filtering.
//!
//! Design follows the classic analog-prototype route: Butterworth low-pass
//! poles, low-pass to band-pass transform, then the bilinear transform with
//! pre-warped edges. Coefficients come out in transfer-function form with
//! `a[0] == 1`, and are applied with a transposed direct-form II recursion
//! starting from rest.

use crate::container::Signal;
use crate::error::ConfigurationError;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::thread;

/// Highest prototype order accepted; transfer-function coefficients lose
/// precision quickly past this for very narrow low edges.
pub const MAX_ORDER: u32 = 8;

/// Band-pass filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Lower pass-band edge in Hz
    pub low_cutoff_hz: f64,
    /// Upper pass-band edge in Hz
    pub high_cutoff_hz: f64,
    /// Assumed uniform sample rate in Hz
    pub sampling_rate_hz: f64,
    /// Prototype order (the band-pass has twice this many poles)
    pub order: u32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            low_cutoff_hz: 0.05,
            high_cutoff_hz: 40.0,
            sampling_rate_hz: 1000.0,
            order: 1,
        }
    }
}

impl FilterSpec {
    pub fn nyquist_hz(&self) -> f64 {
        0.5 * self.sampling_rate_hz
    }

    pub fn with_sampling_rate(mut self, sampling_rate_hz: f64) -> Self {
        self.sampling_rate_hz = sampling_rate_hz;
        self
    }

    /// Validate rate, order and `0 < low < high < nyquist`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.sampling_rate_hz.is_finite() && self.sampling_rate_hz > 0.0) {
            return Err(ConfigurationError::InvalidSamplingRate {
                rate: self.sampling_rate_hz,
            });
        }

        if !(1..=MAX_ORDER).contains(&self.order) {
            return Err(ConfigurationError::InvalidOrder {
                order: self.order,
                max: MAX_ORDER,
            });
        }

        let nyquist = self.nyquist_hz();
        let ordered = 0.0 < self.low_cutoff_hz
            && self.low_cutoff_hz < self.high_cutoff_hz
            && self.high_cutoff_hz < nyquist;
        if !ordered {
            return Err(ConfigurationError::InvalidCutoffs {
                low: self.low_cutoff_hz,
                high: self.high_cutoff_hz,
                nyquist,
            });
        }

        Ok(())
    }

    /// Cutoffs as fractions of the Nyquist frequency.
    pub fn normalized_cutoffs(&self) -> (f64, f64) {
        let nyquist = self.nyquist_hz();
        (self.low_cutoff_hz / nyquist, self.high_cutoff_hz / nyquist)
    }

    fn cache_key(&self) -> FilterKey {
        FilterKey {
            low: self.low_cutoff_hz.to_bits(),
            high: self.high_cutoff_hz.to_bits(),
            rate: self.sampling_rate_hz.to_bits(),
            order: self.order,
        }
    }
}

/// Transfer-function coefficients, highest power of `z^-1` last.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    /// Numerator
    pub b: Vec<f64>,
    /// Denominator, `a[0] == 1`
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Run the filter over `input` from zero initial state.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let n = self.a.len().max(self.b.len());
        let coeff = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);
        let mut state = vec![0.0; n.saturating_sub(1)];
        let mut output = Vec::with_capacity(input.len());

        for &x in input {
            let y = coeff(&self.b, 0) * x + state.first().copied().unwrap_or(0.0);
            for k in 0..state.len() {
                let next = state.get(k + 1).copied().unwrap_or(0.0);
                state[k] = coeff(&self.b, k + 1) * x - coeff(&self.a, k + 1) * y + next;
            }
            output.push(y);
        }

        output
    }

    /// Magnitude of the frequency response at `freq_hz`.
    pub fn magnitude_response(&self, freq_hz: f64, sampling_rate_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sampling_rate_hz;
        // Powers of z^-1 = e^{-j omega}
        let z_inv = Complex64::from_polar(1.0, -omega);
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .rev()
                .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
        };
        (eval(&self.b) / eval(&self.a)).norm()
    }
}

/// Design a digital Butterworth band-pass filter.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the sampling rate, order, or cutoff
/// ordering is invalid.
pub fn design_bandpass(spec: &FilterSpec) -> Result<FilterCoefficients, ConfigurationError> {
    spec.validate()?;

    let order = spec.order as usize;
    let (low, high) = spec.normalized_cutoffs();

    // Pre-warp the normalized edges for a bilinear transform at fs = 2
    let fs = 2.0;
    let warped_low = 2.0 * fs * (PI * low / fs).tan();
    let warped_high = 2.0 * fs * (PI * high / fs).tan();
    let bandwidth = warped_high - warped_low;
    let center = (warped_low * warped_high).sqrt();

    // Analog low-pass prototype poles on the left half of the unit circle
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let m = 2.0 * k as f64 - (order as f64 - 1.0);
            -Complex64::from_polar(1.0, PI * m / (2.0 * order as f64))
        })
        .collect();

    // Low-pass to band-pass: each pole splits in two, N zeros land at s = 0
    let mut analog_poles = Vec::with_capacity(2 * order);
    let mut mirrored = Vec::with_capacity(order);
    for &p in &prototype {
        let scaled = p * (bandwidth / 2.0);
        let offset = (scaled * scaled - center * center).sqrt();
        analog_poles.push(scaled + offset);
        mirrored.push(scaled - offset);
    }
    analog_poles.extend(mirrored);
    let analog_gain = bandwidth.powi(order as i32);

    // Bilinear transform: s = 2 fs (z - 1) / (z + 1)
    let fs2 = Complex64::new(2.0 * fs, 0.0);
    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();
    let mut digital_zeros = vec![Complex64::new(1.0, 0.0); order];
    digital_zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(order));

    // Analog zeros at the origin contribute fs2 each
    let zero_factor = fs2.powi(order as i32);
    let pole_factor = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = analog_gain * (zero_factor / pole_factor).re;

    let b = poly(&digital_zeros).into_iter().map(|c| c * gain).collect();
    let a = poly(&digital_poles);

    tracing::debug!(
        order = spec.order,
        low_hz = spec.low_cutoff_hz,
        high_hz = spec.high_cutoff_hz,
        sampling_rate_hz = spec.sampling_rate_hz,
        "Designed Butterworth band-pass"
    );

    Ok(FilterCoefficients { b, a })
}

/// Monic polynomial coefficients with the given roots, highest degree first.
/// Roots come in conjugate pairs, so only the real parts are kept.
fn poly(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs.into_iter().map(|c| c.re).collect()
}

/// Filter every signal independently, keeping labels.
pub fn filter_signals(
    coefficients: &FilterCoefficients,
    signals: &[Signal],
    parallel: bool,
) -> Vec<Signal> {
    let filter_one = |signal: &Signal| signal.with_samples(coefficients.apply(signal.samples()));

    if parallel && signals.len() > 1 {
        thread::scope(|scope| {
            let handles: Vec<_> = signals
                .iter()
                .map(|signal| scope.spawn(move || filter_one(signal)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    } else {
        signals.iter().map(filter_one).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FilterKey {
    low: u64,
    high: u64,
    rate: u64,
    order: u32,
}

/// Designed coefficients keyed by the exact filter parameters.
#[derive(Debug, Default)]
pub struct CoefficientCache {
    entries: HashMap<FilterKey, Arc<FilterCoefficients>>,
}

impl CoefficientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return cached coefficients for `spec`, designing them on first use.
    pub fn get_or_design(
        &mut self,
        spec: &FilterSpec,
    ) -> Result<Arc<FilterCoefficients>, ConfigurationError> {
        let key = spec.cache_key();
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let designed = Arc::new(design_bandpass(spec)?);
        self.entries.insert(key, Arc::clone(&designed));
        Ok(designed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{} vs {}", a, e);
        }
    }

    #[test]
    fn test_default_spec_valid() {
        FilterSpec::default()
            .validate()
            .expect("Default filter should be valid");
    }

    #[test]
    fn test_first_order_structure() {
        let coeffs = design_bandpass(&FilterSpec::default()).unwrap();

        assert_eq!(coeffs.b.len(), 3);
        assert_eq!(coeffs.a.len(), 3);
        assert_eq!(coeffs.a[0], 1.0);
        // b = g * [1, 0, -1] for a first-order band-pass
        assert!(coeffs.b[1].abs() < 1e-12);
        assert!((coeffs.b[0] + coeffs.b[2]).abs() < 1e-12);
    }

    #[test]
    fn test_first_order_matches_closed_form() {
        // H(s) = bw s / (s^2 + bw s + wo^2) through s = 4 (z-1)/(z+1)
        let spec = FilterSpec::default();
        let (low, high) = spec.normalized_cutoffs();
        let wl = 4.0 * (PI * low / 2.0).tan();
        let wh = 4.0 * (PI * high / 2.0).tan();
        let bw = wh - wl;
        let wo2 = wl * wh;
        let a0 = 16.0 + 4.0 * bw + wo2;
        let g = 4.0 * bw / a0;

        let coeffs = design_bandpass(&spec).unwrap();
        assert_close(&coeffs.b, &[g, 0.0, -g], 1e-12);
        assert_close(
            &coeffs.a,
            &[1.0, (2.0 * wo2 - 32.0) / a0, (16.0 - 4.0 * bw + wo2) / a0],
            1e-12,
        );
    }

    #[test]
    fn test_design_is_deterministic() {
        let spec = FilterSpec {
            order: 3,
            ..FilterSpec::default()
        };
        let first = design_bandpass(&spec).unwrap();
        let second = design_bandpass(&spec).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.a.len(), 7);
    }

    #[test]
    fn test_invalid_cutoffs_rejected() {
        let reversed = FilterSpec {
            low_cutoff_hz: 40.0,
            high_cutoff_hz: 0.05,
            ..FilterSpec::default()
        };
        assert!(matches!(
            design_bandpass(&reversed),
            Err(ConfigurationError::InvalidCutoffs { .. })
        ));

        let above_nyquist = FilterSpec {
            high_cutoff_hz: 500.0,
            ..FilterSpec::default()
        };
        assert!(design_bandpass(&above_nyquist).is_err());

        let zero_low = FilterSpec {
            low_cutoff_hz: 0.0,
            ..FilterSpec::default()
        };
        assert!(design_bandpass(&zero_low).is_err());
    }

    #[test]
    fn test_invalid_order_rejected() {
        let spec = FilterSpec {
            order: 0,
            ..FilterSpec::default()
        };
        assert_eq!(
            design_bandpass(&spec),
            Err(ConfigurationError::InvalidOrder {
                order: 0,
                max: MAX_ORDER
            })
        );
    }

    #[test]
    fn test_dc_rejected() {
        let coeffs = design_bandpass(&FilterSpec::default()).unwrap();
        let output = coeffs.apply(&vec![100.0; 40_000]);

        let tail = &output[output.len() - 1000..];
        assert!(tail.iter().all(|v| v.abs() < 0.5));
        assert!(coeffs.magnitude_response(0.0, 1000.0) < 1e-9);
    }

    #[test]
    fn test_passband_gain_near_unity() {
        let spec = FilterSpec {
            order: 2,
            ..FilterSpec::default()
        };
        let coeffs = design_bandpass(&spec).unwrap();

        let center = (spec.low_cutoff_hz * spec.high_cutoff_hz).sqrt();
        assert!((coeffs.magnitude_response(center, 1000.0) - 1.0).abs() < 0.05);
        // -3 dB at the upper edge
        let edge = coeffs.magnitude_response(spec.high_cutoff_hz, 1000.0);
        assert!((edge - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!(coeffs.magnitude_response(200.0, 1000.0) < 0.1);
    }

    #[test]
    fn test_apply_is_causal() {
        let coeffs = design_bandpass(&FilterSpec::default()).unwrap();
        let mut impulse = vec![0.0; 20];
        impulse[5] = 1.0;

        let output = coeffs.apply(&impulse);
        assert!(output[..5].iter().all(|&v| v == 0.0));
        assert!((output[5] - coeffs.b[0]).abs() < 1e-15);
    }

    #[test]
    fn test_filter_signals_parallel_matches_sequential() {
        let coeffs = design_bandpass(&FilterSpec::default()).unwrap();
        let signals: Vec<Signal> = (0..4)
            .map(|ch| {
                let samples = (0..500).map(|i| ((i * (ch + 1)) as f64 * 0.05).sin()).collect();
                Signal::new(samples, Some(format!("Lead {}", ch)))
            })
            .collect();

        let sequential = filter_signals(&coeffs, &signals, false);
        let parallel = filter_signals(&coeffs, &signals, true);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential[2].source_label(), Some("Lead 2"));
    }

    #[test]
    fn test_cache_matches_fresh_design() {
        let mut cache = CoefficientCache::new();
        let spec = FilterSpec {
            order: 2,
            ..FilterSpec::default()
        };

        let cached = cache.get_or_design(&spec).unwrap();
        let again = cache.get_or_design(&spec).unwrap();
        assert!(Arc::ptr_eq(&cached, &again));
        assert_eq!(cache.len(), 1);
        assert_eq!(*cached, design_bandpass(&spec).unwrap());

        cache.get_or_design(&FilterSpec::default()).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let mut cache = CoefficientCache::new();
        let bad = FilterSpec {
            sampling_rate_hz: 0.0,
            ..FilterSpec::default()
        };
        assert!(cache.get_or_design(&bad).is_err());
        assert!(cache.is_empty());
    }
}
