//! Ordered key-value store seam
//!
//! The view delegates durability and ordering to an [`IndexStore`]. The store
//! must provide:
//!
//! - Atomic multi-key batches: every op of a batch is visible, or none is
//! - Bytewise-ordered iteration over a snapshot
//! - Thread-safe access from one writer and many readers
//!
//! Two implementations ship with the crate: [`FjallStore`] (on disk) and
//! [`MemoryStore`] (in memory, with failure injection for tests).

mod errors;
mod fjall_store;
mod memory;

use std::ops::Bound;

use serde::{Deserialize, Serialize};

pub use errors::{StoreError, StoreResult};
pub use fjall_store::FjallStore;
pub use memory::MemoryStore;

/// A single mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } => key,
            BatchOp::Delete { key } => key,
        }
    }
}

/// Byte range for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub lower: Bound<Vec<u8>>,
    pub upper: Bound<Vec<u8>>,
}

impl ScanRange {
    pub fn all() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// True when no key can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi))
            | (Bound::Excluded(lo), Bound::Included(hi))
            | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
            _ => false,
        }
    }
}

/// Key/value pairs in key order (or reverse order). Owns its snapshot, so it
/// outlives the store handle it came from.
pub type StoreIter = Box<dyn Iterator<Item = StoreResult<(Vec<u8>, Vec<u8>)>>>;

/// How hard a committed batch is pushed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Leave flushing to the store's journal
    #[default]
    Buffer,
    /// fdatasync after every batch
    SyncData,
    /// fsync after every batch
    SyncAll,
}

/// Ordered key-value store owned by one view.
pub trait IndexStore: Send + Sync {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Apply all ops atomically, in order. Later ops on the same key win.
    fn write_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;

    /// Iterate a consistent snapshot of `range`.
    fn scan(&self, range: ScanRange, reverse: bool) -> StoreIter;

    fn is_empty(&self) -> StoreResult<bool>;

    /// Persist everything written so far.
    fn flush(&self) -> StoreResult<()>;
}
