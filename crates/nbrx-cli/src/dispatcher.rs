//! Fan-out of ingested batches to every registered channel worker.

use nbrx_io::SampleBatch;

use crate::channel::ChannelInput;
use crate::registry::ChannelRegistry;

/// Sends one ingested batch to every currently registered channel. Cloning
/// a [`SampleBatch`] is a reference-count bump, not a copy, so fan-out to
/// an arbitrary number of channels costs one clone each rather than one
/// allocation each.
///
/// A channel whose queue has been dropped (its worker already exited,
/// e.g. after a panic unwound past its own catch boundary) is logged and
/// skipped rather than treated as fatal to the ingest loop.
pub fn dispatch(registry: &ChannelRegistry, batch: &SampleBatch) {
    for handle in registry.snapshot() {
        if handle.sender.send(ChannelInput::Batch(batch.clone())).is_err() {
            tracing::warn!(if_freq = handle.if_freq_hz, "channel worker queue closed, dropping batch");
        }
    }
}

/// Sends a shutdown message to every registered channel, e.g. once the
/// ingest loop observes Ctrl+C.
pub fn shutdown_all(registry: &ChannelRegistry) {
    for handle in registry.snapshot() {
        let _ = handle.sender.send(ChannelInput::Shutdown);
    }
}
