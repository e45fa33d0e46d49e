//! Spectrum scanner: learns the noise floor, then flags new carriers.

use std::collections::BTreeSet;

use nbrx_analysis::{NoiseFloor, NoiseFloorLearner, WelchEstimator};
use nbrx_core::Config;
use nbrx_io::SampleBatch;

/// Rounds a frequency offset to the nearest multiple of `step`.
fn round_to_step(freq_hz: f64, step: i64) -> i64 {
    (freq_hz / step as f64).round() as i64 * step
}

/// Learns the receiver's noise floor from the first few wideband batches,
/// then reports candidate carrier frequencies in every batch afterward.
pub struct Scanner {
    estimator: WelchEstimator,
    learner: NoiseFloorLearner,
    noise_floor: Option<NoiseFloor>,
    center_hz: i64,
    input_rate_hz: i64,
    step: i64,
}

impl Scanner {
    /// Builds a scanner that waits for `n_noise` snapshots before setting a
    /// threshold `thresh_factor` standard deviations above the learned floor.
    #[must_use]
    pub fn new(center_hz: i64, input_rate_hz: i64, step: i64, n_noise: usize, thresh_factor: f32) -> Self {
        Self {
            estimator: WelchEstimator::new(),
            learner: NoiseFloorLearner::new(n_noise, thresh_factor),
            noise_floor: None,
            center_hz,
            input_rate_hz,
            step,
        }
    }

    /// Whether the noise floor has been learned and the scanner is now
    /// actively flagging candidates.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.noise_floor.is_some()
    }

    /// Mean spectral noise level learned so far, in dB. This is the Welch
    /// PSD threshold learner's baseline, used only to decide when a new
    /// carrier is worth opening a channel for — distinct from (and
    /// unrelated to) each channel's own adaptive `dbfs_off` squelch floor.
    /// Returns a very low floor before learning completes.
    #[must_use]
    pub fn noise_floor_mean_db(&self) -> f32 {
        self.noise_floor.map_or(f32::NEG_INFINITY, |f| f.mean_db)
    }

    /// Feeds one wideband batch through the PSD estimator. During the
    /// learning phase this only accumulates a snapshot and returns no
    /// candidates; once armed, it returns every RF frequency (Hz) whose
    /// power exceeds the learned threshold, deduplicated to one entry per
    /// `step`-aligned bin and filtered to frequencies the receiver can
    /// actually demodulate.
    pub fn observe(&mut self, batch: &SampleBatch) -> Vec<i64> {
        let (freqs, psd_db) = self.estimator.estimate(batch, self.input_rate_hz as f64);

        if !self.learner.is_ready() {
            self.learner.push_snapshot(psd_db);
            if self.learner.is_ready() {
                let floor = self.learner.learn();
                tracing::info!(
                    mean_db = floor.mean_db,
                    std_db = floor.std_db,
                    threshold_db = floor.threshold_db,
                    "noise floor learned, scanner armed"
                );
                self.noise_floor = Some(floor);
            }
            return Vec::new();
        }

        let threshold_db = self.noise_floor.expect("learner ready implies floor set").threshold_db;

        let mut candidates = BTreeSet::new();
        for (&offset_hz, &power_db) in freqs.iter().zip(psd_db.iter()) {
            if power_db > threshold_db {
                candidates.insert(round_to_step(offset_hz, self.step));
            }
        }

        candidates
            .into_iter()
            .filter_map(|if_offset| {
                let abs_freq = self.center_hz + if_offset;
                Config::validate_frequency(abs_freq, self.center_hz, self.step, self.input_rate_hz)
                    .ok()
                    .map(|()| abs_freq)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn tone_batch(freq_hz: f64, sample_rate_hz: f64, n: usize) -> SampleBatch {
        (0..n)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * freq_hz * i as f64 / sample_rate_hz;
                Complex::new(theta.cos() as f32, theta.sin() as f32)
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn silence_batch(n: usize) -> SampleBatch {
        vec![Complex::new(0.0f32, 0.0f32); n].into()
    }

    #[test]
    fn stays_unarmed_until_enough_snapshots_collected() {
        let mut scanner = Scanner::new(100_000_000, 2_000_000, 1000, 5, 9.0);
        for _ in 0..4 {
            let candidates = scanner.observe(&silence_batch(8192));
            assert!(candidates.is_empty());
            assert!(!scanner.is_armed());
        }
        scanner.observe(&silence_batch(8192));
        assert!(scanner.is_armed());
    }

    #[test]
    fn arms_then_flags_a_strong_tone() {
        let mut scanner = Scanner::new(100_000_000, 2_000_000, 1000, 5, 3.0);
        for _ in 0..5 {
            scanner.observe(&silence_batch(16384));
        }
        assert!(scanner.is_armed());

        let tone = tone_batch(50_000.0, 2_000_000.0, 16384);
        let candidates = scanner.observe(&tone);
        assert!(candidates.iter().any(|&f| (f - 100_050_000).abs() <= 1000));
    }
}
