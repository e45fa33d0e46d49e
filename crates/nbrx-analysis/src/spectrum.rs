//! Welch power spectral density estimation for the spectrum scanner.

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Samples per Welch segment.
pub const SEGMENT_LEN: usize = 1024;
/// Zero-padded FFT length each segment is transformed at.
pub const FFT_LEN: usize = 8192;
/// Fractional overlap between consecutive segments.
const OVERLAP_FRACTION: f64 = 0.5;

/// A reusable Welch estimator: owns the FFT plan and window so repeated
/// calls across scanner ticks don't replan the FFT each time.
pub struct WelchEstimator {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    window_power: f32,
}

impl WelchEstimator {
    /// Builds an estimator using a periodic Hann window over [`SEGMENT_LEN`]
    /// samples and an [`FFT_LEN`]-point zero-padded transform.
    #[must_use]
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_LEN);
        let window: Vec<f32> = (0..SEGMENT_LEN)
            .map(|n| {
                0.5 - 0.5
                    * (2.0 * std::f32::consts::PI * n as f32 / SEGMENT_LEN as f32).cos()
            })
            .collect();
        let window_power: f32 = window.iter().map(|w| w * w).sum();
        Self { fft, window, window_power }
    }

    /// Estimates the two-sided power spectral density of `samples` (complex
    /// I/Q, so the spectrum isn't symmetric) at `sample_rate_hz`, averaging
    /// overlapping Hann-windowed, zero-padded, mean-removed segments.
    ///
    /// Returns `(frequencies_hz, power_db)`, both of length [`FFT_LEN`],
    /// ordered from `-sample_rate/2` to `sample_rate/2` (DC centered).
    #[must_use]
    pub fn estimate(&self, samples: &[Complex<f32>], sample_rate_hz: f64) -> (Vec<f64>, Vec<f32>) {
        let step = ((SEGMENT_LEN as f64) * (1.0 - OVERLAP_FRACTION)).max(1.0) as usize;
        let mut accum = vec![0.0f32; FFT_LEN];
        let mut segments = 0usize;

        let mut start = 0;
        while start + SEGMENT_LEN <= samples.len() {
            let segment = &samples[start..start + SEGMENT_LEN];
            let mean: Complex<f32> =
                segment.iter().copied().sum::<Complex<f32>>() / segment.len() as f32;

            let mut buf = vec![Complex::new(0.0f32, 0.0f32); FFT_LEN];
            for (i, &s) in segment.iter().enumerate() {
                buf[i] = (s - mean) * self.window[i];
            }
            self.fft.process(&mut buf);

            for (bin, value) in accum.iter_mut().enumerate() {
                *value += buf[bin].norm_sqr();
            }

            segments += 1;
            start += step;
        }

        if segments == 0 {
            tracing::debug!(len = samples.len(), "batch too short for a single Welch segment");
            let freqs = frequency_axis(sample_rate_hz);
            return (freqs, vec![f32::NEG_INFINITY; FFT_LEN]);
        }

        let scale = 1.0 / (segments as f32 * sample_rate_hz as f32 * self.window_power);
        let power_db: Vec<f32> = accum
            .iter()
            .map(|&p| 10.0 * (p * scale).max(1.0e-20).log10())
            .collect();

        (frequency_axis(sample_rate_hz), fftshift(&power_db))
    }
}

impl Default for WelchEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Frequency axis already in fftshift (DC-centered) order: index `0` is
/// `-sample_rate/2`, index `FFT_LEN/2` is DC, index `FFT_LEN-1` is just under
/// `+sample_rate/2`.
fn frequency_axis(sample_rate_hz: f64) -> Vec<f64> {
    (0..FFT_LEN)
        .map(|j| {
            let k = j as i64 - (FFT_LEN / 2) as i64;
            k as f64 * sample_rate_hz / FFT_LEN as f64
        })
        .collect()
}

fn fftshift(v: &[f32]) -> Vec<f32> {
    let mid = v.len() / 2;
    let mut out = Vec::with_capacity(v.len());
    out.extend_from_slice(&v[mid..]);
    out.extend_from_slice(&v[..mid]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq_hz: f64, sample_rate_hz: f64, n: usize) -> Vec<Complex<f32>> {
        (0..n)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * freq_hz * i as f64 / sample_rate_hz;
                Complex::new(theta.cos() as f32, theta.sin() as f32)
            })
            .collect()
    }

    #[test]
    fn output_lengths_match_fft_len() {
        let est = WelchEstimator::new();
        let samples = tone(1000.0, 25_000.0, SEGMENT_LEN * 4);
        let (freqs, power) = est.estimate(&samples, 25_000.0);
        assert_eq!(freqs.len(), FFT_LEN);
        assert_eq!(power.len(), FFT_LEN);
    }

    #[test]
    fn tone_produces_a_peak_near_its_frequency() {
        let est = WelchEstimator::new();
        let sample_rate = 25_000.0;
        let tone_freq = 5_000.0;
        let samples = tone(tone_freq, sample_rate, SEGMENT_LEN * 6);
        let (freqs, power) = est.estimate(&samples, sample_rate);

        let (peak_idx, _) =
            power.iter().enumerate().max_by(|a, b| a.1.partial_cmp(b.1).unwrap()).unwrap();
        let peak_freq = freqs[peak_idx];
        assert!((peak_freq - tone_freq).abs() < sample_rate / FFT_LEN as f64 * 4.0);
    }

    #[test]
    fn too_short_input_reports_negative_infinity_rather_than_panicking() {
        let est = WelchEstimator::new();
        let samples = tone(1000.0, 25_000.0, SEGMENT_LEN - 1);
        let (_, power) = est.estimate(&samples, 25_000.0);
        assert!(power.iter().all(|p| p.is_infinite() && p.is_sign_negative()));
    }
}
