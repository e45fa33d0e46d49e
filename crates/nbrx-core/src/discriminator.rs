//! FM and AM discrimination: turning a baseband IF stream into audio samples.

use num_complex::Complex;

use crate::math::wrap_phase;

/// Phase-difference FM discriminator.
///
/// Each output sample is the wrapped phase angle between consecutive IF
/// samples, scaled so that a signal deviating by the channel's full IF
/// bandwidth produces an audio sample near full scale. The scale factor
/// `0.25 * if_rate / (pi * if_bandwidth)` falls out of treating half the IF
/// bandwidth as the maximum expected deviation.
#[derive(Debug, Clone)]
pub struct FmDiscriminator {
    scale: f32,
    prev: Complex<f32>,
}

impl FmDiscriminator {
    /// Builds a discriminator for a channel with the given IF sample rate
    /// and IF bandwidth, both in Hz.
    #[must_use]
    pub fn new(if_rate_hz: i64, if_bandwidth_hz: i64) -> Self {
        let scale = 0.25 * if_rate_hz as f32 / (std::f32::consts::PI * if_bandwidth_hz as f32);
        Self { scale, prev: Complex::new(0.0, 0.0) }
    }

    /// Discriminates one IF sample, carrying the previous-sample state needed
    /// for the phase difference across calls.
    pub fn discriminate_one(&mut self, sample: Complex<f32>) -> f32 {
        let diff = sample * self.prev.conj();
        self.prev = sample;
        wrap_phase(diff.im.atan2(diff.re)) * self.scale
    }

    /// Discriminates a block, preserving state across the call boundary the
    /// same way [`FmDiscriminator::discriminate_one`] does sample-to-sample.
    pub fn discriminate_block(&mut self, input: &[Complex<f32>]) -> Vec<f32> {
        input.iter().map(|&s| self.discriminate_one(s)).collect()
    }
}

/// Envelope (magnitude) AM discriminator.
///
/// Unlike FM discrimination this carries no state of its own; the DC offset
/// an envelope detector introduces is removed downstream by a streaming
/// high-pass [`FirFilter`](crate::fir::FirFilter) rather than inside the
/// discriminator.
#[derive(Debug, Clone, Default)]
pub struct AmDiscriminator;

impl AmDiscriminator {
    /// Builds an AM discriminator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Discriminates one IF sample to its magnitude.
    pub fn discriminate_one(&mut self, sample: Complex<f32>) -> f32 {
        sample.norm()
    }

    /// Discriminates a block of IF samples to their magnitudes.
    pub fn discriminate_block(&mut self, input: &[Complex<f32>]) -> Vec<f32> {
        input.iter().map(Complex::norm).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fm_discriminator_is_zero_for_constant_phase() {
        let mut disc = FmDiscriminator::new(25_000, 12_500);
        let sample = Complex::new(1.0, 0.0);
        disc.discriminate_one(sample);
        let out = disc.discriminate_one(sample);
        assert!(out.abs() < 1e-5);
    }

    #[test]
    fn fm_discriminator_responds_to_phase_step() {
        let mut disc = FmDiscriminator::new(25_000, 12_500);
        disc.discriminate_one(Complex::new(1.0, 0.0));
        let out = disc.discriminate_one(Complex::new(0.0, 1.0));
        assert!(out > 0.0);
    }

    #[test]
    fn am_discriminator_reports_magnitude() {
        let mut disc = AmDiscriminator::new();
        let out = disc.discriminate_one(Complex::new(3.0, 4.0));
        assert!((out - 5.0).abs() < 1e-6);
    }

    #[test]
    fn fm_discriminator_block_matches_sample_by_sample() {
        let input: Vec<Complex<f32>> = (0..30)
            .map(|i| Complex::new((i as f32 * 0.2).cos(), (i as f32 * 0.2).sin()))
            .collect();

        let mut whole = FmDiscriminator::new(25_000, 12_500);
        let whole_out = whole.discriminate_block(&input);

        let mut one_at_a_time = FmDiscriminator::new(25_000, 12_500);
        let sample_out: Vec<f32> =
            input.iter().map(|&s| one_at_a_time.discriminate_one(s)).collect();

        for (a, b) in whole_out.iter().zip(sample_out.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
