//! Write pipeline
//!
//! Log entry -> transform stage -> [`Extraction`] -> batch -> atomic commit.
//!
//! # Invariants
//!
//! - Index records, metadata and cursor of a batch commit together or not
//!   at all
//! - The published cursor only moves after a successful commit
//! - Within one batch the last write to a key wins
//! - A batch assembled before a rebuild is never committed after it

mod batch;
mod commit;
mod extraction;
mod sink;

pub use commit::FlushReport;
pub use extraction::{Extraction, Stage, Transform};
pub use sink::{DrainCallback, Sink, SinkReport};
