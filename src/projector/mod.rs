//! Read projector
//!
//! Point lookups ([`Lookup`]) and range scans ([`Scan`]) over a view's
//! index, resolving pointer-style records against the log.
//!
//! # Invariants
//!
//! - Reserved records are never emitted unless explicitly requested
//! - A pointer whose log entry was purged reads as absent, and is removed
//! - A cleanup delete never removes a record rewritten since it was read

mod lookup;
mod options;
mod record;
mod scan;

pub(crate) use lookup::get;
pub use lookup::Lookup;
pub use options::ReadOptions;
pub use record::{Projection, Record};
pub use scan::Scan;
