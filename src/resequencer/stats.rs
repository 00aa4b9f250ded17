/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Delivery counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by an engine as it accepts and delivers elements.
#[derive(Debug, Default)]
pub struct ResequencerStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    duplicates: AtomicU64,
    delivered: AtomicU64,
    forced: AtomicU64,
    batches: AtomicU64,
    sink_failures: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`ResequencerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Elements that entered the buffer.
    pub accepted: u64,
    /// Elements refused by `push` for any reason other than duplication.
    pub rejected: u64,
    /// Elements refused as duplicates.
    pub duplicates: u64,
    /// Elements handed to the sink.
    pub delivered: u64,
    /// Elements delivered by breaking a gap after the timeout.
    pub forced: u64,
    /// Batches handed to the sink.
    pub batches: u64,
    /// Sink invocations that returned an error.
    pub sink_failures: u64,
    /// Elements discarded on stop or reset.
    pub dropped: u64,
}

impl ResequencerStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, count: u64) {
        self.delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_forced(&self) {
        self.forced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            forced: self.forced.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
