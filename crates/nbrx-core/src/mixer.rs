//! Carrier mixing: shifting a channel's IF offset down to baseband.
//!
//! The mixing tone `exp(-j*2*pi*if_freq*n/input_rate)` is periodic with
//! period `input_rate / gcd(|if_freq|, input_rate)` samples, so a table of
//! exactly that length, indexed modulo its own length, reproduces the tone
//! exactly without needing to know how large an input batch can get.

use num_complex::Complex;

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 { 1 } else { a }
}

/// Downconverts a channel's IF offset to baseband by multiplying against a
/// precomputed complex exponential, carrying phase continuity across calls.
#[derive(Debug, Clone)]
pub struct CarrierMixer {
    table: Vec<Complex<f32>>,
    phase: usize,
}

impl CarrierMixer {
    /// Builds a mixer for shifting `if_freq_hz` (signed, relative to the
    /// wideband center) down to zero, given the wideband `input_rate_hz`.
    #[must_use]
    pub fn new(if_freq_hz: i64, input_rate_hz: i64) -> Self {
        let period = input_rate_hz / gcd(if_freq_hz, input_rate_hz);
        let period = period.max(1) as usize;
        let table = (0..period)
            .map(|n| {
                let theta = -2.0 * std::f64::consts::PI * if_freq_hz as f64 * n as f64
                    / input_rate_hz as f64;
                Complex::new(theta.cos() as f32, theta.sin() as f32)
            })
            .collect();
        Self { table, phase: 0 }
    }

    /// Mixes one complex sample, advancing the internal phase by one step.
    pub fn mix_one(&mut self, sample: Complex<f32>) -> Complex<f32> {
        let out = sample * self.table[self.phase];
        self.phase = (self.phase + 1) % self.table.len();
        out
    }

    /// Mixes a block of samples in place of repeated [`CarrierMixer::mix_one`]
    /// calls, carrying phase across the call boundary exactly as repeated
    /// single-sample calls would.
    pub fn mix_block(&mut self, input: &[Complex<f32>]) -> Vec<Complex<f32>> {
        input.iter().map(|&s| self.mix_one(s)).collect()
    }
}
