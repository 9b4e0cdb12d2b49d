//! fjall-backed index store
//!
//! One keyspace per view directory with a single `index` partition. Batches
//! go through `Keyspace::batch`, which fjall commits atomically.

use std::fs;
use std::path::{Path, PathBuf};

use fjall::{
    Keyspace, KvPair, LsmError, PartitionCreateOptions, PartitionHandle, PersistMode, Snapshot,
};

use super::errors::{StoreError, StoreResult};
use super::{BatchOp, Durability, IndexStore, ScanRange, StoreIter};

const INDEX_PARTITION: &str = "index";

/// Range iterator that keeps its snapshot registered until dropped.
struct SnapshotIter {
    _snapshot: Snapshot,
    pairs: Box<dyn DoubleEndedIterator<Item = Result<KvPair, LsmError>>>,
}

impl Iterator for SnapshotIter {
    type Item = StoreResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pairs.next().map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(StoreError::from)
        })
    }
}

pub struct FjallStore {
    path: PathBuf,
    keyspace: Keyspace,
    partition: PartitionHandle,
    durability: Durability,
}

impl FjallStore {
    /// Opens or creates the store at `path`, creating directories as needed.
    pub fn open(path: &Path, durability: Durability) -> StoreResult<Self> {
        fs::create_dir_all(path)?;

        let keyspace = fjall::Config::new(path).open()?;
        let partition =
            keyspace.open_partition(INDEX_PARTITION, PartitionCreateOptions::default())?;

        Ok(Self {
            path: path.to_path_buf(),
            keyspace,
            partition,
            durability,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_mode(&self) -> Option<PersistMode> {
        match self.durability {
            Durability::Buffer => None,
            Durability::SyncData => Some(PersistMode::SyncData),
            Durability::SyncAll => Some(PersistMode::SyncAll),
        }
    }
}

impl IndexStore for FjallStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.partition.get(key)?.map(|v| v.to_vec()))
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let mut batch = self.keyspace.batch();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.insert(&self.partition, key, value),
                BatchOp::Delete { key } => batch.remove(&self.partition, key),
            }
        }
        batch.commit()?;

        if let Some(mode) = self.persist_mode() {
            self.keyspace.persist(mode)?;
        }
        Ok(())
    }

    fn scan(&self, range: ScanRange, reverse: bool) -> StoreIter {
        if range.is_empty() {
            return Box::new(std::iter::empty());
        }

        // Pinned to the seqno at call time; batches committed later stay invisible
        let snapshot = self.partition.snapshot();
        let pairs = snapshot.range((range.lower, range.upper));
        let pairs: Box<dyn DoubleEndedIterator<Item = Result<KvPair, LsmError>>> =
            if reverse { Box::new(pairs.rev()) } else { Box::new(pairs) };

        Box::new(SnapshotIter {
            _snapshot: snapshot,
            pairs,
        })
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.partition.is_empty()?)
    }

    fn flush(&self) -> StoreResult<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
