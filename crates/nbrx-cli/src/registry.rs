//! Shared registry of currently-demodulated channels.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nbrx_core::config::CHANNEL_SPACING;

/// Handle a worker registers itself under so the dispatcher can reach it
/// and the scanner can check whether a frequency is already covered.
#[derive(Clone)]
pub struct ChannelHandle {
    /// Channel's IF offset from the wideband center, in Hz. Also the
    /// registry key.
    pub if_freq_hz: i64,
    /// Sender half of this channel's input queue.
    pub sender: crossbeam_channel::Sender<crate::channel::ChannelInput>,
}

/// `Arc<RwLock<HashMap>>` of every active channel, keyed by IF offset.
/// Readers (the dispatcher, on every ingest tick) vastly outnumber writers
/// (the scanner, only when it opens a new channel), so a `RwLock` over a
/// mutex lets fan-out proceed without serializing on a single lock.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<i64, ChannelHandle>>>,
}

impl ChannelRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new channel, replacing any existing entry at the same
    /// IF offset.
    pub fn insert(&self, handle: ChannelHandle) {
        self.inner.write().expect("registry lock poisoned").insert(handle.if_freq_hz, handle);
    }

    /// Removes a channel, e.g. after its worker thread exits.
    pub fn remove(&self, if_freq_hz: i64) {
        self.inner.write().expect("registry lock poisoned").remove(&if_freq_hz);
    }

    /// Snapshot of every registered channel's handle, for fan-out.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChannelHandle> {
        self.inner.read().expect("registry lock poisoned").values().cloned().collect()
    }

    /// Whether `if_freq_hz` already falls within an existing channel's span
    /// — the half-open interval `(existing - spacing/2, existing + spacing/2]`
    /// — so the scanner doesn't open a second channel on top of one already
    /// being demodulated.
    #[must_use]
    pub fn covers(&self, if_freq_hz: i64) -> bool {
        let half = CHANNEL_SPACING / 2;
        self.inner
            .read()
            .expect("registry lock poisoned")
            .keys()
            .any(|&existing| if_freq_hz > existing - half && if_freq_hz <= existing + half)
    }

    /// Number of currently registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").len()
    }

    /// Whether the registry currently holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(if_freq_hz: i64) -> ChannelHandle {
        let (tx, _rx) = crossbeam_channel::unbounded();
        ChannelHandle { if_freq_hz, sender: tx }
    }

    #[test]
    fn insert_and_snapshot_round_trip() {
        let registry = ChannelRegistry::new();
        registry.insert(handle(12_500));
        registry.insert(handle(25_000));
        assert_eq!(registry.len(), 2);
        let snap = registry.snapshot();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn covers_detects_nearby_frequency() {
        let registry = ChannelRegistry::new();
        registry.insert(handle(100_000));
        let half = CHANNEL_SPACING / 2;
        assert!(registry.covers(100_000));
        // Upper bound is inclusive.
        assert!(registry.covers(100_000 + half - 1));
        assert!(registry.covers(100_000 + half));
        assert!(!registry.covers(100_000 + half + 1));
        // Lower bound is exclusive.
        assert!(!registry.covers(100_000 - half));
        assert!(registry.covers(100_000 - half + 1));
    }

    #[test]
    fn remove_drops_entry() {
        let registry = ChannelRegistry::new();
        registry.insert(handle(50_000));
        assert_eq!(registry.len(), 1);
        registry.remove(50_000);
        assert!(registry.is_empty());
    }
}
