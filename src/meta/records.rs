//! Persisted record shapes
//!
//! All record values are stored as JSON. Decoding failures surface as
//! `serde_json::Error` and are classified as corruption by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::Key;
use crate::log::Seq;

/// Caller-supplied schema tag. A stored tag that differs from the requested
/// one triggers a full rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaVersion {
    Number(i64),
    Text(String),
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Number(n) => write!(f, "{}", n),
            SchemaVersion::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for SchemaVersion {
    fn from(v: i64) -> Self {
        SchemaVersion::Number(v)
    }
}

impl From<i32> for SchemaVersion {
    fn from(v: i32) -> Self {
        SchemaVersion::Number(v as i64)
    }
}

impl From<u32> for SchemaVersion {
    fn from(v: u32) -> Self {
        SchemaVersion::Number(v as i64)
    }
}

impl From<&str> for SchemaVersion {
    fn from(v: &str) -> Self {
        SchemaVersion::Text(v.to_string())
    }
}

impl From<String> for SchemaVersion {
    fn from(v: String) -> Self {
        SchemaVersion::Text(v)
    }
}

/// Last record folded into the most recent batch.
///
/// Diagnostic only: restart position always comes from `since`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub seq: Seq,
    pub key: Option<Key>,
}

/// The singleton metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub schema_version: SchemaVersion,
    /// Highest sequence fully committed
    pub since: Seq,
    pub continuation: Option<Continuation>,
}

impl MetadataRecord {
    /// Metadata for a view whose first batch starts at `first_seq`.
    pub fn new(schema_version: SchemaVersion, first_seq: Seq) -> Self {
        Self {
            schema_version,
            since: first_seq,
            continuation: None,
        }
    }

    /// Advance `since`, never moving it backwards.
    pub fn fold(&mut self, seq: Seq) {
        self.since = self.since.max(seq);
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The singleton cursor record, mirroring `since` so it can be read without
/// decoding the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRecord {
    pub since: Seq,
}

impl CursorRecord {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Stored value of an application index record.
///
/// `value: None` is a pointer into the log; `Some` holds the materialized
/// value. An explicit JSON `null` value is stored as a pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub seq: Seq,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl IndexEntry {
    pub fn pointer(seq: Seq) -> Self {
        Self { seq, value: None }
    }

    pub fn inline(seq: Seq, value: Value) -> Self {
        Self {
            seq,
            value: Some(value),
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.value.is_none()
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
