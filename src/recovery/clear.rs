//! Chunked, resumable clear
//!
//! The reserved records go first, in their own batch. After that the store
//! holds no metadata, so a clear interrupted at any later point is detected at
//! the next open (non-empty store, no metadata) and finished there.

use crate::errors::{ViewError, ViewResult};
use crate::key::ViewKey;
use crate::store::{BatchOp, IndexStore, ScanRange, StoreResult};

/// Outcome of a completed clear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearStats {
    /// Application records deleted
    pub records_removed: usize,
    /// Delete batches committed, including the reserved-records batch
    pub batches: usize,
}

/// Delete every persisted record of a view.
pub fn clear_all(store: &dyn IndexStore, chunk_size: usize) -> ViewResult<ClearStats> {
    let mut stats = ClearStats::default();

    store
        .write_batch(vec![
            BatchOp::Delete {
                key: ViewKey::Meta.encode(),
            },
            BatchOp::Delete {
                key: ViewKey::Cursor.encode(),
            },
        ])
        .map_err(|e| ViewError::storage("failed to delete view metadata", e))?;
    stats.batches += 1;

    loop {
        let keys = next_chunk(store, chunk_size)
            .map_err(|e| ViewError::storage("failed to scan records for clear", e))?;
        if keys.is_empty() {
            break;
        }

        let count = keys.len();
        store
            .write_batch(keys.into_iter().map(|key| BatchOp::Delete { key }).collect())
            .map_err(|e| ViewError::storage("failed to delete index records", e))?;
        stats.records_removed += count;
        stats.batches += 1;
    }

    Ok(stats)
}

fn next_chunk(store: &dyn IndexStore, chunk_size: usize) -> StoreResult<Vec<Vec<u8>>> {
    store
        .scan(ScanRange::all(), false)
        .take(chunk_size)
        .map(|item| item.map(|(key, _)| key))
        .collect()
}
