//! Interface to the external append-only log
//!
//! The view never writes to the log. It reads entries back by sequence when a
//! pointer-style record is projected, and derives its storage directory from
//! the log's location.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Log sequence number. Strictly increasing across the log's lifetime.
pub type Seq = u64;

/// One immutable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: Seq,
    pub value: Value,
}

impl LogEntry {
    pub fn new(seq: Seq, value: Value) -> Self {
        Self { seq, value }
    }
}

/// Errors reported by the log when resolving a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The entry existed but has since been purged.
    #[error("log entry {0} has been deleted")]
    Deleted(Seq),

    #[error("log read failed: {0}")]
    Read(String),
}

impl LogError {
    pub fn is_deleted(&self) -> bool {
        matches!(self, LogError::Deleted(_))
    }
}

/// Read-only view of the log.
pub trait Log: Send + Sync {
    /// Resolve an entry's value by sequence.
    fn get(&self, seq: Seq) -> Result<Value, LogError>;

    /// Directory the log lives in. Views are stored beneath it.
    fn directory(&self) -> Option<PathBuf>;

    /// Current log head, if the log tracks one. Used for error context only.
    fn since(&self) -> Option<Seq> {
        None
    }
}
