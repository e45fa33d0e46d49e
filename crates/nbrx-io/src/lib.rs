//! Sample batching, raw I/Q ingestion, and the WAV recording sink.

mod batch;
mod ingest;
mod sink;

pub use batch::{batch_from_vec, SampleBatch};
pub use ingest::IqIngest;
pub use sink::{decode_timestamp_watermark, encode_timestamp_watermark, WavSink};

/// Errors raised by I/Q ingestion or WAV recording.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A WAV file could not be written or read.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The raw I/Q stream or recording directory could not be read/written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
