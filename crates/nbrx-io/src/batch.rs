//! The unit of work passed from the ingest loop to every channel worker.

use num_complex::Complex;

/// One tick's worth of wideband I/Q samples, shared read-only with every
/// channel worker via reference counting rather than copied per channel.
pub type SampleBatch = std::sync::Arc<[Complex<f32>]>;

/// Builds a [`SampleBatch`] from an owned `Vec`, consuming it without an
/// extra copy.
#[must_use]
pub fn batch_from_vec(samples: Vec<Complex<f32>>) -> SampleBatch {
    samples.into()
}
