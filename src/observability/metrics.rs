//! Per-view counters
//!
//! Counters only, monotonic, relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ViewMetrics {
    batches_committed: AtomicU64,
    records_written: AtomicU64,
    commit_failures: AtomicU64,
    rebuilds: AtomicU64,
    stale_pointers_healed: AtomicU64,
}

/// Point-in-time copy of [`ViewMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub batches_committed: u64,
    pub records_written: u64,
    pub commit_failures: u64,
    pub rebuilds: u64,
    pub stale_pointers_healed: u64,
}

impl ViewMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_commit(&self, records: u64) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records, Ordering::Relaxed);
    }

    pub fn increment_commit_failures(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rebuilds(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_pointers(&self) {
        self.stale_pointers_healed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            stale_pointers_healed: self.stale_pointers_healed.load(Ordering::Relaxed),
        }
    }
}
