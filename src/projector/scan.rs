//! Lazy range scan
//!
//! Records are pulled from a store snapshot one at a time. Stale pointers are
//! skipped (and cleaned up best-effort); the first storage, log or decoding
//! error is yielded once and ends the scan.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{ViewError, ViewResult};
use crate::key::ViewKey;
use crate::log::Seq;
use crate::meta::{CursorRecord, IndexEntry, MetadataRecord};
use crate::observability::Logger;
use crate::store::{IndexStore, StoreIter};
use crate::view::ViewInner;

use super::lookup::{heal, resolve, Resolution};
use super::record::{Projection, Record};

pub struct Scan<'a> {
    inner: &'a ViewInner,
    store: Arc<dyn IndexStore>,
    iter: StoreIter,
    projection: Projection,
    include_internal: bool,
    remaining: Option<usize>,
    done: bool,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(
        inner: &'a ViewInner,
        store: Arc<dyn IndexStore>,
        iter: StoreIter,
        projection: Projection,
        include_internal: bool,
        limit: Option<usize>,
    ) -> Self {
        Self {
            inner,
            store,
            iter,
            projection,
            include_internal,
            remaining: limit,
            done: false,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    fn project(&self, key_bytes: Vec<u8>, raw: Vec<u8>) -> ViewResult<Option<Record>> {
        let key = ViewKey::decode(&key_bytes).map_err(ViewError::corrupt_key)?;

        let (seq, value) = match &key {
            ViewKey::Meta | ViewKey::Cursor if !self.include_internal => return Ok(None),
            ViewKey::Meta => {
                let meta = MetadataRecord::decode(&raw).map_err(|e| {
                    ViewError::corruption(Some(ViewKey::Meta), "metadata record could not be decoded", e)
                })?;
                (meta.since, self.internal_value(&key, &raw)?)
            }
            ViewKey::Cursor => {
                let cursor = CursorRecord::decode(&raw).map_err(|e| {
                    ViewError::corruption(Some(ViewKey::Cursor), "cursor record could not be decoded", e)
                })?;
                (cursor.since, self.internal_value(&key, &raw)?)
            }
            ViewKey::User(_) => {
                let entry = IndexEntry::decode(&raw).map_err(|e| {
                    ViewError::corruption(Some(key.clone()), "index record could not be decoded", e)
                })?;
                if !self.projection.wants_values() {
                    (entry.seq, None)
                } else {
                    match resolve(self.inner, &key, entry)? {
                        Resolution::Found(lookup) => (lookup.seq, Some(lookup.value)),
                        Resolution::Stale { seq, .. } => {
                            self.heal_best_effort(&key, &key_bytes, seq);
                            return Ok(None);
                        }
                    }
                }
            }
        };

        Ok(Some(self.projection.build(key, seq, value)))
    }

    fn internal_value(&self, key: &ViewKey, raw: &[u8]) -> ViewResult<Option<Value>> {
        if !self.projection.wants_values() {
            return Ok(None);
        }
        serde_json::from_slice(raw)
            .map(Some)
            .map_err(|e| ViewError::corruption(Some(key.clone()), "internal record is not JSON", e))
    }

    fn heal_best_effort(&self, key: &ViewKey, key_bytes: &[u8], seq: Seq) {
        if let Err(e) = heal(self.inner, self.store.as_ref(), key, key_bytes, seq) {
            Logger::warn(
                "SCAN_SKIPPED_STALE_POINTER",
                &[
                    ("view", self.inner.name.as_str()),
                    ("key", &key.to_string()),
                    ("error", &e.to_string()),
                ],
            );
        }
    }
}

impl fmt::Debug for Scan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("view", &self.inner.name)
            .field("projection", &self.projection)
            .field("include_internal", &self.include_internal)
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish()
    }
}

impl Iterator for Scan<'_> {
    type Item = ViewResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }

        loop {
            let (key_bytes, raw) = match self.iter.next()? {
                Ok(pair) => pair,
                Err(e) => {
                    self.done = true;
                    return Some(Err(ViewError::storage("index scan failed", e)));
                }
            };

            match self.project(key_bytes, raw) {
                Ok(Some(record)) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
