//! Raw interleaved-u8 I/Q stream ingestion.

use std::io::Read;

use num_complex::Complex;

use crate::batch::{batch_from_vec, SampleBatch};
use crate::Result;

/// Midpoint of an unsigned 8-bit I/Q sample (RTL-SDR style: `0..=255`
/// centered on 127.5, not 128, since the ADC has no true zero code).
const U8_MIDPOINT: f32 = 127.5;
/// Scale an I/Q sample is divided by after centering, a plain power-of-two
/// full-scale rather than the (different) midpoint above.
const U8_SCALE: f32 = 128.0;

/// Reads interleaved unsigned-8-bit I/Q pairs from any [`Read`] source and
/// turns them into [`SampleBatch`]es, carrying a leftover odd byte across
/// calls when a read ends mid-pair.
pub struct IqIngest<R> {
    reader: R,
    carry: Option<u8>,
}

impl<R: Read> IqIngest<R> {
    /// Wraps `reader` as an I/Q source.
    pub fn new(reader: R) -> Self {
        Self { reader, carry: None }
    }

    /// Reads up to `num_complex_samples` complex samples (i.e. up to
    /// `2 * num_complex_samples` raw bytes, plus one carried-over byte from
    /// the previous call) and returns the resulting batch. Returns an empty
    /// batch at end of stream.
    pub fn read_batch(&mut self, num_complex_samples: usize) -> Result<SampleBatch> {
        let needed_bytes = num_complex_samples * 2;
        let mut raw = Vec::with_capacity(needed_bytes + 1);
        if let Some(b) = self.carry.take() {
            raw.push(b);
        }

        let mut buf = vec![0u8; needed_bytes];
        let mut filled = 0;
        while filled < needed_bytes.saturating_sub(raw.len()) {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        raw.extend_from_slice(&buf[..filled]);

        if raw.len() % 2 == 1 {
            self.carry = raw.pop();
        }

        let samples: Vec<Complex<f32>> = raw
            .chunks_exact(2)
            .map(|pair| {
                Complex::new(
                    (pair[0] as f32 - U8_MIDPOINT) / U8_SCALE,
                    (pair[1] as f32 - U8_MIDPOINT) / U8_SCALE,
                )
            })
            .collect();

        Ok(batch_from_vec(samples))
    }
}
