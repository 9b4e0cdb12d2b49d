//! logview - materialized secondary indexes over an append-only log
//!
//! A view consumes log entries through a [`Sink`], maps each one through an
//! application transform into index records, and commits them in atomic
//! batches to an ordered store together with its bookkeeping records. The
//! observable cursor ([`View::since`]) tells readers how far the view has
//! caught up.
//!
//! ```text
//! log -> Sink -> Transform/Stage -> PendingBatch -> IndexStore
//!                                                      |
//!                         View::get / View::read <-----+---> Log (pointers)
//! ```
//!
//! # Invariants
//!
//! - A batch's records, metadata and cursor commit together or not at all
//! - The cursor never moves backwards except to the sentinel during a rebuild
//! - A changed schema version discards everything before new data is written
//! - Pointers to purged log entries read as absent and are removed

pub mod cursor;
pub mod errors;
pub mod key;
pub mod log;
pub mod meta;
pub mod observability;
pub mod pipeline;
pub mod projector;
pub mod recovery;
pub mod store;
pub mod view;

pub use cursor::Cursor;
pub use errors::{ErrorCode, ViewError, ViewResult};
pub use key::{Key, ViewKey};
pub use log::{Log, LogEntry, LogError, Seq};
pub use meta::{MetadataRecord, SchemaVersion};
pub use pipeline::{Extraction, FlushReport, Sink, SinkReport, Stage, Transform};
pub use projector::{Lookup, Projection, ReadOptions, Record, Scan};
pub use recovery::{RebuildReason, Startup};
pub use store::{Durability, FjallStore, IndexStore, MemoryStore};
pub use view::{create_view, Phase, View, ViewConfig, ViewFactory};
