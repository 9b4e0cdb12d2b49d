//! Persisted bookkeeping records
//!
//! - [`MetadataRecord`] at `ViewKey::Meta`: schema tag, `since`, continuation
//! - [`CursorRecord`] at `ViewKey::Cursor`: `since` only, written every commit
//! - [`IndexEntry`]: the stored value of every application record

mod records;

pub use records::{Continuation, CursorRecord, IndexEntry, MetadataRecord, SchemaVersion};
