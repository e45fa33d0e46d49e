//! Spectral analysis for the channel scanner: Welch PSD estimation and
//! noise-floor threshold learning.

pub mod spectrum;
pub mod threshold;

pub use spectrum::{WelchEstimator, FFT_LEN, SEGMENT_LEN};
pub use threshold::{NoiseFloor, NoiseFloorLearner};
