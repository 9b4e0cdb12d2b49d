//! Version & recovery controller
//!
//! Decides at open whether a view resumes from its stored cursor or discards
//! its persisted state, and owns the clear procedure used by rebuilds and
//! `destroy`.
//!
//! # Invariants
//!
//! - The cursor is reset before the first record of a rebuild is deleted
//! - Metadata is deleted before any application record, so a partial clear
//!   is always recognizable at the next open
//! - No batch is committed while a clear is pending

mod clear;
mod startup;

pub use clear::{clear_all, ClearStats};
pub use startup::{RebuildReason, RecoveryManager, Startup};
