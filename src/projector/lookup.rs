//! Point lookups and pointer resolution
//!
//! A pointer-style record is resolved by reading the log at its seq. When the
//! log reports that entry as deleted, the record is stale: it is deleted from
//! the index (only if it still holds the same pointer) and treated as absent.
//! The delete is skipped when a commit holds the lock; a later read retries it.

use serde_json::Value;

use crate::errors::{ViewError, ViewResult};
use crate::key::{Key, ViewKey};
use crate::log::{LogError, Seq};
use crate::meta::IndexEntry;
use crate::observability::{log_event, Event, Logger};
use crate::store::{BatchOp, IndexStore};
use crate::view::ViewInner;

/// Result of a point lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub value: Value,
    pub seq: Seq,
}

pub(crate) enum Resolution {
    Found(Lookup),
    Stale { seq: Seq, source: LogError },
}

pub(crate) fn get(inner: &ViewInner, store: &dyn IndexStore, key: Key) -> ViewResult<Lookup> {
    let view_key = ViewKey::User(key);
    let key_bytes = view_key.encode();

    let raw = store
        .get(&key_bytes)
        .map_err(|e| ViewError::storage("index lookup failed", e).with_key(view_key.clone()))?;
    let Some(raw) = raw else {
        return Err(ViewError::not_found(view_key));
    };
    let entry = IndexEntry::decode(&raw).map_err(|e| {
        ViewError::corruption(Some(view_key.clone()), "index record could not be decoded", e)
    })?;

    match resolve(inner, &view_key, entry)? {
        Resolution::Found(lookup) => Ok(lookup),
        Resolution::Stale { seq, source } => {
            heal(inner, store, &view_key, &key_bytes, seq)?;
            Err(ViewError::stale_pointer(view_key, seq, source))
        }
    }
}

/// Turn a stored entry into its value, reading the log for pointers.
pub(crate) fn resolve(
    inner: &ViewInner,
    key: &ViewKey,
    entry: IndexEntry,
) -> ViewResult<Resolution> {
    if let Some(value) = entry.value {
        return Ok(Resolution::Found(Lookup {
            value,
            seq: entry.seq,
        }));
    }

    match inner.log.get(entry.seq) {
        Ok(value) => Ok(Resolution::Found(Lookup {
            value,
            seq: entry.seq,
        })),
        Err(source) if source.is_deleted() => Ok(Resolution::Stale {
            seq: entry.seq,
            source,
        }),
        Err(source) => {
            let mut err = ViewError::log_resolution(key.clone(), entry.seq, source);
            if let Some(head) = inner.log.since() {
                err = err.with_details(format!("log since: {}", head));
            }
            Err(err)
        }
    }
}

/// Delete `key` if it still points at `stale_seq`. Returns whether a record
/// was removed.
pub(crate) fn heal(
    inner: &ViewInner,
    store: &dyn IndexStore,
    key: &ViewKey,
    key_bytes: &[u8],
    stale_seq: Seq,
) -> ViewResult<bool> {
    let Some(_state) = inner.try_lock_state() else {
        Logger::trace(
            "STALE_POINTER_HEAL_DEFERRED",
            &[
                ("view", inner.name.as_str()),
                ("key", &key.to_string()),
                ("seq", &stale_seq.to_string()),
            ],
        );
        return Ok(false);
    };

    let current = store
        .get(key_bytes)
        .map_err(|e| ViewError::storage("stale pointer cleanup failed", e).with_key(key.clone()))?;
    let still_stale = current
        .and_then(|raw| IndexEntry::decode(&raw).ok())
        .is_some_and(|entry| entry.is_pointer() && entry.seq == stale_seq);
    if !still_stale {
        return Ok(false);
    }

    let key_text = key.to_string();
    let seq_text = stale_seq.to_string();
    match store.write_batch(vec![BatchOp::Delete {
        key: key_bytes.to_vec(),
    }]) {
        Ok(()) => {
            inner.metrics.increment_stale_pointers();
            log_event(
                Event::StalePointerHealed,
                &[
                    ("view", inner.name.as_str()),
                    ("key", &key_text),
                    ("seq", &seq_text),
                ],
            );
            Ok(true)
        }
        Err(e) => {
            let err = ViewError::storage("stale pointer cleanup failed", e)
                .with_key(key.clone())
                .with_seq(stale_seq);
            log_event(
                Event::StalePointerCleanupFailed,
                &[
                    ("view", inner.name.as_str()),
                    ("key", &key_text),
                    ("seq", &seq_text),
                    ("error", &err.to_string()),
                ],
            );
            Err(err)
        }
    }
}
