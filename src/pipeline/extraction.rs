//! What a transform extracts from a log entry

use serde_json::Value;

use crate::key::Key;
use crate::log::{LogEntry, Seq};
use crate::meta::MetadataRecord;

/// Output of one transform call.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Index the entry under every key in `keys`.
    ///
    /// `value: None` stores pointers to `seq`; `Some` materializes the value.
    /// An empty key list advances the cursor without writing a record.
    Put {
        seq: Seq,
        keys: Vec<Key>,
        value: Option<Value>,
    },
    /// Remove the records at `keys`. Still counts toward the cursor.
    Delete { seq: Seq, keys: Vec<Key> },
    /// Flush everything buffered so far before reading further.
    Sync,
}

impl Extraction {
    /// Pointer-style put.
    pub fn pointer(seq: Seq, keys: Vec<Key>) -> Self {
        Extraction::Put {
            seq,
            keys,
            value: None,
        }
    }

    /// Value-style put.
    pub fn inline(seq: Seq, keys: Vec<Key>, value: Value) -> Self {
        Extraction::Put {
            seq,
            keys,
            value: Some(value),
        }
    }

    /// Advance the cursor past `seq` without indexing anything.
    pub fn skip(seq: Seq) -> Self {
        Extraction::Put {
            seq,
            keys: Vec::new(),
            value: None,
        }
    }

    pub fn seq(&self) -> Option<Seq> {
        match self {
            Extraction::Put { seq, .. } | Extraction::Delete { seq, .. } => Some(*seq),
            Extraction::Sync => None,
        }
    }
}

/// Per-sink mapping from log entries to extractions.
pub trait Stage: Send {
    fn map(&mut self, entry: LogEntry) -> Extraction;
}

impl<F> Stage for F
where
    F: FnMut(LogEntry) -> Extraction + Send,
{
    fn map(&mut self, entry: LogEntry) -> Extraction {
        self(entry)
    }
}

/// Application-supplied transform.
///
/// Called once per sink with the metadata as it stood when the sink was
/// created (`None` for a fresh or rebuilt view), returning the stage that
/// maps that sink's entries.
pub trait Transform: Send + Sync {
    fn stage(&self, meta: Option<&MetadataRecord>) -> Box<dyn Stage>;
}

/// Stateless transforms can be plain functions or closures.
impl<F> Transform for F
where
    F: Fn(LogEntry) -> Extraction + Clone + Send + Sync + 'static,
{
    fn stage(&self, _meta: Option<&MetadataRecord>) -> Box<dyn Stage> {
        Box::new(self.clone())
    }
}
