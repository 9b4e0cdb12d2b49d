//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures_util::stream::{self, Stream};
use logview::{
    create_view, ErrorCode, Extraction, FlushReport, Key, Log, LogEntry, LogError, Seq, ViewError,
    ViewFactory,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// In-memory log with purge support.
#[derive(Default)]
pub struct MemoryLog {
    entries: RwLock<BTreeMap<Seq, Value>>,
    deleted: RwLock<HashSet<Seq>>,
    broken: RwLock<HashSet<Seq>>,
    next_seq: AtomicU64,
    dir: Option<PathBuf>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            dir: Some(dir),
            ..Self::default()
        }
    }

    /// Append `value` and return its entry.
    pub fn append(&self, value: Value) -> LogEntry {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.write().unwrap().insert(seq, value.clone());
        LogEntry::new(seq, value)
    }

    pub fn purge(&self, seq: Seq) {
        self.entries.write().unwrap().remove(&seq);
        self.deleted.write().unwrap().insert(seq);
    }

    /// Reads of `seq` fail with a non-deletion error.
    pub fn break_entry(&self, seq: Seq) {
        self.broken.write().unwrap().insert(seq);
    }

    /// Every entry after `since` (all entries for `None`), in order.
    pub fn entries_after(&self, since: Option<Seq>) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(seq, _)| since.map_or(true, |s| **seq > s))
            .map(|(seq, value)| LogEntry::new(*seq, value.clone()))
            .collect()
    }

    pub fn stream_after(&self, since: Option<Seq>) -> impl Stream<Item = LogEntry> {
        stream::iter(self.entries_after(since))
    }
}

impl Log for MemoryLog {
    fn get(&self, seq: Seq) -> Result<Value, LogError> {
        if self.broken.read().unwrap().contains(&seq) {
            return Err(LogError::Read(format!("entry {} unreadable", seq)));
        }
        if self.deleted.read().unwrap().contains(&seq) {
            return Err(LogError::Deleted(seq));
        }
        self.entries
            .read()
            .unwrap()
            .get(&seq)
            .cloned()
            .ok_or_else(|| LogError::Read(format!("entry {} not written", seq)))
    }

    fn directory(&self) -> Option<PathBuf> {
        self.dir.clone()
    }

    fn since(&self) -> Option<Seq> {
        self.next_seq.load(Ordering::SeqCst).checked_sub(1)
    }
}

/// Index entries by their `key` field, pointer style.
pub fn by_key(entry: LogEntry) -> Extraction {
    match entry.value.get("key").and_then(Key::from_json) {
        Some(key) => Extraction::pointer(entry.seq, vec![key]),
        None => Extraction::skip(entry.seq),
    }
}

/// Index entries by their `key` field, storing the `value` field inline.
/// `{"delete": k}` removes `k`.
pub fn by_key_inline(entry: LogEntry) -> Extraction {
    if let Some(key) = entry.value.get("delete").and_then(Key::from_json) {
        return Extraction::Delete {
            seq: entry.seq,
            keys: vec![key],
        };
    }
    match entry.value.get("key").and_then(Key::from_json) {
        Some(key) => {
            let value = entry.value.get("value").cloned().unwrap_or(Value::Null);
            Extraction::inline(entry.seq, vec![key], value)
        }
        None => Extraction::skip(entry.seq),
    }
}

pub fn pointer_factory(version: i64) -> ViewFactory {
    create_view(version, by_key)
}

pub fn inline_factory(version: i64) -> ViewFactory {
    create_view(version, by_key_inline)
}

pub fn doc(key: &str, value: Value) -> Value {
    json!({"key": key, "value": value})
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Flushed(FlushReport),
    Failed(ErrorCode),
}

/// Collects every drain notification.
#[derive(Clone, Default)]
pub struct Drains {
    inner: Arc<RwLock<Vec<Observation>>>,
}

impl Drains {
    pub fn callback(&self) -> impl FnMut(Result<&FlushReport, &ViewError>) + Send + 'static {
        let inner = Arc::clone(&self.inner);
        move |result: Result<&FlushReport, &ViewError>| {
            let observed = match result {
                Ok(report) => Observation::Flushed(*report),
                Err(e) => Observation::Failed(e.code()),
            };
            inner.write().unwrap().push(observed);
        }
    }

    pub fn all(&self) -> Vec<Observation> {
        self.inner.read().unwrap().clone()
    }
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}
