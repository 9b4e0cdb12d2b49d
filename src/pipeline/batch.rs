//! Batch accumulation
//!
//! Extractions are folded into a [`PendingBatch`] keyed by encoded key, so a
//! key written twice in one batch keeps only its last write. At commit the
//! batch becomes one atomic set of store ops: the index records, the
//! metadata record and the cursor record.

use std::collections::BTreeMap;

use crate::errors::{ViewError, ViewResult};
use crate::key::{Key, ViewKey};
use crate::log::Seq;
use crate::meta::{Continuation, CursorRecord, IndexEntry, MetadataRecord};
use crate::store::BatchOp;

use super::extraction::Extraction;

#[derive(Debug, Clone, PartialEq)]
enum PendingOp {
    Put(Key, IndexEntry),
    Delete,
}

#[derive(Debug)]
pub(crate) struct PendingBatch {
    epoch: u64,
    ops: BTreeMap<Vec<u8>, PendingOp>,
    entries: usize,
    first_seq: Option<Seq>,
    max_seq: Option<Seq>,
    last: Option<Continuation>,
}

impl PendingBatch {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ops: BTreeMap::new(),
            entries: 0,
            first_seq: None,
            max_seq: None,
            last: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Log entries folded in so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Distinct keys that will be written or deleted.
    pub fn records(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn first_seq(&self) -> Option<Seq> {
        self.first_seq
    }

    pub fn max_seq(&self) -> Option<Seq> {
        self.max_seq
    }

    pub fn continuation(&self) -> Option<&Continuation> {
        self.last.as_ref()
    }

    /// Fold one extraction in. `Sync` is handled by the sink and ignored here.
    pub fn push(&mut self, extraction: Extraction) {
        let (seq, last_key) = match extraction {
            Extraction::Put { seq, keys, value } => {
                let entry = match value {
                    Some(value) if !value.is_null() => IndexEntry::inline(seq, value),
                    _ => IndexEntry::pointer(seq),
                };
                let last_key = keys.last().cloned();
                for key in keys {
                    self.ops
                        .insert(key.encode(), PendingOp::Put(key, entry.clone()));
                }
                (seq, last_key)
            }
            Extraction::Delete { seq, keys } => {
                let last_key = keys.last().cloned();
                for key in keys {
                    self.ops.insert(key.encode(), PendingOp::Delete);
                }
                (seq, last_key)
            }
            Extraction::Sync => return,
        };

        self.entries += 1;
        self.first_seq.get_or_insert(seq);
        self.max_seq = Some(self.max_seq.map_or(seq, |max| max.max(seq)));
        self.last = Some(Continuation { seq, key: last_key });
    }

    /// Store ops for this batch, given the metadata as it will stand after
    /// the commit.
    pub fn into_ops(self, meta: &MetadataRecord) -> ViewResult<Vec<BatchOp>> {
        let mut ops = Vec::with_capacity(self.ops.len() + 2);
        for (key, op) in self.ops {
            match op {
                PendingOp::Put(user_key, entry) => {
                    let value = entry
                        .encode()
                        .map_err(|e| ViewError::encoding(Some(ViewKey::User(user_key)), e))?;
                    ops.push(BatchOp::Put { key, value });
                }
                PendingOp::Delete => ops.push(BatchOp::Delete { key }),
            }
        }

        ops.push(BatchOp::Put {
            key: ViewKey::Meta.encode(),
            value: meta
                .encode()
                .map_err(|e| ViewError::encoding(Some(ViewKey::Meta), e))?,
        });
        ops.push(BatchOp::Put {
            key: ViewKey::Cursor.encode(),
            value: CursorRecord { since: meta.since }
                .encode()
                .map_err(|e| ViewError::encoding(Some(ViewKey::Cursor), e))?,
        });
        Ok(ops)
    }
}
