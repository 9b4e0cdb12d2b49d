//! In-memory index store
//!
//! A `BTreeMap` behind a `RwLock`. Batches are applied under the write lock,
//! so readers observe either none or all of a batch. Scans copy the requested
//! range, which gives them snapshot semantics.
//!
//! Failure injection (`fail_next_batches`, `fail_next_gets`) lets tests
//! simulate a crash or I/O error in the middle of a commit.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::{BatchOp, IndexStore, ScanRange, StoreIter};

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    failing_batches: AtomicUsize,
    passing_batches: AtomicUsize,
    failing_gets: AtomicUsize,
    batches_applied: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls to `write_batch` fail without applying anything.
    pub fn fail_next_batches(&self, count: usize) {
        self.fail_batches_after(0, count);
    }

    /// Let `passing` batches through, then fail the following `count`.
    pub fn fail_batches_after(&self, passing: usize, count: usize) {
        self.passing_batches.store(passing, Ordering::SeqCst);
        self.failing_batches.store(count, Ordering::SeqCst);
    }

    /// The next `count` calls to `get` fail.
    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    /// Number of batches successfully applied.
    pub fn batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::SeqCst)
    }

    /// Copy of the full contents.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl IndexStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if Self::take_failure(&self.failing_gets) {
            return Err(StoreError::Injected("get".to_string()));
        }
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        if self.failing_batches.load(Ordering::SeqCst) > 0
            && !Self::take_failure(&self.passing_batches)
            && Self::take_failure(&self.failing_batches)
        {
            return Err(StoreError::Injected("write_batch".to_string()));
        }
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        self.batches_applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn scan(&self, range: ScanRange, reverse: bool) -> StoreIter {
        if range.is_empty() {
            return Box::new(std::iter::empty());
        }
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        let bounds: (Bound<Vec<u8>>, Bound<Vec<u8>>) = (range.lower, range.upper);
        let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = data
            .range(bounds)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if reverse {
            pairs.reverse();
        }
        Box::new(pairs.into_iter().map(Ok))
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len() == 0)
    }

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &[u8], value: &[u8]) -> BatchOp {
        BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        store.write_batch(vec![put(b"a", b"1")]).unwrap();

        store.fail_next_batches(1);
        let result = store.write_batch(vec![put(b"b", b"2"), BatchOp::Delete { key: b"a".to_vec() }]);
        assert!(matches!(result, Err(StoreError::Injected(_))));

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
        assert_eq!(store.batches_applied(), 1);

        // Injection is consumed
        store.write_batch(vec![put(b"b", b"2")]).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_later_op_in_batch_wins() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![put(b"k", b"1"), put(b"k", b"2")])
            .unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_scan_is_a_snapshot() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![put(b"a", b"1"), put(b"b", b"2")])
            .unwrap();

        let iter = store.scan(ScanRange::all(), false);
        store.write_batch(vec![put(b"c", b"3")]).unwrap();

        assert_eq!(iter.count(), 2);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let store = MemoryStore::new();
        store.write_batch(vec![put(b"a", b"1")]).unwrap();
        let range = ScanRange {
            lower: Bound::Excluded(b"b".to_vec()),
            upper: Bound::Excluded(b"a".to_vec()),
        };
        assert_eq!(store.scan(range, false).count(), 0);
    }

    #[test]
    fn test_injected_get_failure() {
        let store = MemoryStore::new();
        store.fail_next_gets(1);
        assert!(store.get(b"a").is_err());
        assert!(store.get(b"a").unwrap().is_none());
    }
}
