//! Windowed-sinc FIR low-pass design and a streaming filter over it.
//!
//! Coefficients are derived directly: an ideal low-pass sinc truncated to
//! `num_taps` and shaped by a Kaiser window, the same construction classic
//! FIR design tools use internally for a Kaiser window argument.

use std::ops::{Add, Mul};

/// Fraction of the cutoff frequency used as the transition bandwidth when
/// the caller doesn't have one to hand.
const TRANSITION_FRACTION: f64 = 0.10;
/// Transition bandwidth floor, in Hz, so a very low cutoff doesn't degenerate
/// into an unworkably long (or zero-width) transition band.
const TRANSITION_FLOOR_HZ: f64 = 50.0;
/// Stopband attenuation used whenever a call site doesn't specify its own.
const DEFAULT_STOPBAND_ATTEN_DB: f64 = 60.0;

/// Zeroth-order modified Bessel function of the first kind, via its power
/// series. Six terms is plenty for the magnitudes Kaiser windows need.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let half_x_sq = (x / 2.0) * (x / 2.0);
    for k in 1..=20 {
        term *= half_x_sq / (k as f64 * k as f64);
        sum += term;
        if term < sum * 1e-15 {
            break;
        }
    }
    sum
}

/// Kaiser window beta parameter from the desired stopband attenuation, using
/// the standard piecewise formula (Oppenheim & Schafer / Kaiser 1974).
fn kaiser_beta(atten_db: f64) -> f64 {
    if atten_db > 50.0 {
        0.1102 * (atten_db - 8.7)
    } else if atten_db >= 21.0 {
        0.5842 * (atten_db - 21.0).powf(0.4) + 0.07886 * (atten_db - 21.0)
    } else {
        0.0
    }
}

/// Number of taps needed to hit `atten_db` stopband attenuation over a
/// `transition_hz`-wide transition band at `sample_rate_hz`, rounded up to
/// the next odd number (a Type I linear-phase filter needs an odd length to
/// have a single, exactly-representable center tap).
fn kaiser_num_taps(atten_db: f64, transition_hz: f64, sample_rate_hz: f64) -> usize {
    let transition_norm = (transition_hz / sample_rate_hz).max(1e-6);
    let n = ((atten_db - 8.0) / (2.285 * 2.0 * std::f64::consts::PI * transition_norm)).ceil();
    let n = n.max(3.0) as usize;
    if n % 2 == 0 { n + 1 } else { n }
}

/// Designs a low-pass FIR filter with cutoff `cutoff_hz` at `sample_rate_hz`,
/// returning normalized (unity DC gain) `f32` coefficients.
#[must_use]
pub fn design_lowpass(cutoff_hz: f64, sample_rate_hz: f64) -> Vec<f32> {
    design_lowpass_with(cutoff_hz, sample_rate_hz, DEFAULT_STOPBAND_ATTEN_DB)
}

/// As [`design_lowpass`], with an explicit stopband attenuation target.
#[must_use]
pub fn design_lowpass_with(cutoff_hz: f64, sample_rate_hz: f64, atten_db: f64) -> Vec<f32> {
    let transition_hz = (cutoff_hz * TRANSITION_FRACTION).max(TRANSITION_FLOOR_HZ);
    let num_taps = kaiser_num_taps(atten_db, transition_hz, sample_rate_hz);
    let beta = kaiser_beta(atten_db);
    let fc = cutoff_hz / sample_rate_hz;

    let m = (num_taps - 1) as f64;
    let i0_beta = bessel_i0(beta);
    let mut taps = vec![0.0f64; num_taps];
    for (n, tap) in taps.iter_mut().enumerate() {
        let shifted = n as f64 - m / 2.0;
        let sinc = if shifted.abs() < 1e-12 {
            2.0 * fc
        } else {
            (2.0 * std::f64::consts::PI * fc * shifted).sin() / (std::f64::consts::PI * shifted)
        };
        let ratio = if m > 0.0 { (2.0 * n as f64 / m - 1.0).clamp(-1.0, 1.0) } else { 0.0 };
        let window = bessel_i0(beta * (1.0 - ratio * ratio).sqrt()) / i0_beta;
        *tap = sinc * window;
    }

    let dc_gain: f64 = taps.iter().sum();
    taps.iter().map(|t| (t / dc_gain) as f32).collect()
}

/// Designs a high-pass FIR filter with cutoff `cutoff_hz` at `sample_rate_hz`,
/// returning normalized (unity Nyquist gain) `f32` coefficients, built by
/// spectral inversion of the matching low-pass design.
#[must_use]
pub fn design_highpass(cutoff_hz: f64, sample_rate_hz: f64) -> Vec<f32> {
    design_highpass_with(cutoff_hz, sample_rate_hz, DEFAULT_STOPBAND_ATTEN_DB)
}

/// As [`design_highpass`], with an explicit stopband attenuation target.
#[must_use]
pub fn design_highpass_with(cutoff_hz: f64, sample_rate_hz: f64, atten_db: f64) -> Vec<f32> {
    let mut taps = design_lowpass_with(cutoff_hz, sample_rate_hz, atten_db);
    let center = (taps.len() - 1) / 2;
    for tap in taps.iter_mut() {
        *tap = -*tap;
    }
    taps[center] += 1.0;
    taps
}

/// A streaming FIR filter holding its own tap ring buffer, generic over any
/// sample type that supports scalar multiplication and addition — `f32` for
/// the audio chain, `Complex<f32>` for the IF chain.
#[derive(Debug, Clone)]
pub struct FirFilter<S> {
    taps: Vec<f32>,
    history: Vec<S>,
    pos: usize,
}

impl<S> FirFilter<S>
where
    S: Copy + Default + Mul<f32, Output = S> + Add<Output = S>,
{
    /// Builds a filter from a coefficient set, e.g. the output of
    /// [`design_lowpass`]. History starts zeroed, so the first `taps.len()`
    /// outputs carry a brief startup transient.
    #[must_use]
    pub fn new(taps: Vec<f32>) -> Self {
        let len = taps.len();
        Self { taps, history: vec![S::default(); len], pos: 0 }
    }

    /// Number of taps in the filter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Whether the filter has zero taps (degenerate, but representable).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Pushes one sample into the ring buffer and returns the filtered output.
    /// Calling this `n` times in a row on consecutive samples from a stream
    /// is equivalent to calling [`FirFilter::process_block`] once on the
    /// same `n` samples — the history carries continuity across calls.
    pub fn process_one(&mut self, sample: S) -> S {
        self.history[self.pos] = sample;
        let mut acc = S::default();
        let n = self.taps.len();
        for (k, &tap) in self.taps.iter().enumerate() {
            let idx = (self.pos + n - k) % n;
            acc = acc + self.history[idx] * tap;
        }
        self.pos = (self.pos + 1) % n.max(1);
        acc
    }

    /// Filters an entire block, preserving ring-buffer state across the call
    /// boundary so successive blocks from the same stream filter identically
    /// to one continuous call.
    pub fn process_block(&mut self, input: &[S]) -> Vec<S> {
        input.iter().map(|&s| self.process_one(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_has_unity_dc_gain() {
        let taps = design_lowpass(4_000.0, 25_000.0);
        let dc: f32 = taps.iter().sum();
        assert!((dc - 1.0).abs() < 1e-4);
    }

    #[test]
    fn lowpass_tap_count_is_odd() {
        let taps = design_lowpass(4_000.0, 25_000.0);
        assert_eq!(taps.len() % 2, 1);
    }

    #[test]
    fn dc_input_passes_through_at_unity() {
        let taps = design_lowpass(4_000.0, 25_000.0);
        let mut filt: FirFilter<f32> = FirFilter::new(taps);
        let mut last = 0.0;
        for _ in 0..2000 {
            last = filt.process_one(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3, "settled output {last}");
    }

    #[test]
    fn block_and_sample_processing_agree() {
        let taps = design_lowpass(4_000.0, 25_000.0);
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();

        let mut block_filter: FirFilter<f32> = FirFilter::new(taps.clone());
        let block_out = block_filter.process_block(&input);

        let mut sample_filter: FirFilter<f32> = FirFilter::new(taps);
        let sample_out: Vec<f32> = input.iter().map(|&s| sample_filter.process_one(s)).collect();

        for (a, b) in block_out.iter().zip(sample_out.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn split_blocks_match_one_continuous_block() {
        let taps = design_lowpass(4_000.0, 25_000.0);
        let input: Vec<f32> = (0..100).map(|i| (i as f32 * 0.05).sin()).collect();

        let mut continuous: FirFilter<f32> = FirFilter::new(taps.clone());
        let whole = continuous.process_block(&input);

        let mut split: FirFilter<f32> = FirFilter::new(taps);
        let mut pieced = split.process_block(&input[..37]);
        pieced.extend(split.process_block(&input[37..]));

        for (a, b) in whole.iter().zip(pieced.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn higher_attenuation_uses_more_taps() {
        let loose = design_lowpass_with(4_000.0, 25_000.0, 40.0);
        let tight = design_lowpass_with(4_000.0, 25_000.0, 80.0);
        assert!(tight.len() > loose.len());
    }

    #[test]
    fn highpass_blocks_dc() {
        let taps = design_highpass(100.0, 12_500.0);
        let mut filt: FirFilter<f32> = FirFilter::new(taps);
        let mut last = 1.0;
        for _ in 0..4000 {
            last = filt.process_one(1.0);
        }
        assert!(last.abs() < 1e-2, "settled DC output {last}");
    }

    #[test]
    fn highpass_passes_high_frequency_near_unity() {
        let sample_rate = 12_500.0;
        let taps = design_highpass(100.0, sample_rate);
        let mut filt: FirFilter<f32> = FirFilter::new(taps);
        // Nyquist-rate alternating +-1 sits far above the 100Hz cutoff.
        let mut peak = 0.0f32;
        for n in 0..4000 {
            let sample = if n % 2 == 0 { 1.0 } else { -1.0 };
            let out = filt.process_one(sample);
            if n > 3900 {
                peak = peak.max(out.abs());
            }
        }
        assert!(peak > 0.9, "settled amplitude {peak}");
    }
}
