//! View lifecycle state
//!
//! ```text
//! Uninitialized -> Resuming | Rebuilding -> Ready -> Closing -> Closed
//! ```
//!
//! `destroy` moves any non-closing view back through `Rebuilding`.
//!
//! # Invariants
//!
//! - [`ViewState`] is only mutated through a [`StateGuard`] (the commit lock)
//! - Readers never take the commit lock; they see the [`StateSnapshot`] the
//!   last guard published when it was released

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{MutexGuard, RwLock};

use crate::meta::MetadataRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// Stored metadata matched (or none existed); loading the cursor
    Resuming,
    /// Clearing persisted state; commits are refused
    Rebuilding,
    Ready,
    /// Close requested; the active sink is being stopped
    Closing,
    Closed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Resuming => "resuming",
            Phase::Rebuilding => "rebuilding",
            Phase::Ready => "ready",
            Phase::Closing => "closing",
            Phase::Closed => "closed",
        }
    }

    /// Closing or closed.
    pub fn is_closing(&self) -> bool {
        matches!(self, Phase::Closing | Phase::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state shared by the recovery controller and the write pipeline.
///
/// Lives behind the view's commit lock. Commits, clears and stale-pointer
/// deletes all run while holding it.
#[derive(Debug)]
pub(crate) struct ViewState {
    pub phase: Phase,
    /// In-memory copy of the last committed metadata record
    pub meta: Option<MetadataRecord>,
    /// Bumped by every rebuild; batches assembled under an older epoch are
    /// refused
    pub epoch: u64,
    /// Stored schema version differed from the requested one at open
    pub outdated: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            meta: None,
            epoch: 0,
            outdated: false,
        }
    }
}

/// Reader-side copy of the fields a read may need.
#[derive(Debug, Clone)]
pub(crate) struct StateSnapshot {
    pub phase: Phase,
    pub meta: Option<MetadataRecord>,
    pub outdated: bool,
}

impl StateSnapshot {
    pub fn of(state: &ViewState) -> Self {
        Self {
            phase: state.phase,
            meta: state.meta.clone(),
            outdated: state.outdated,
        }
    }
}

/// Commit lock guard. Publishes a fresh [`StateSnapshot`] on release.
pub(crate) struct StateGuard<'a> {
    state: MutexGuard<'a, ViewState>,
    published: &'a RwLock<StateSnapshot>,
}

impl<'a> StateGuard<'a> {
    pub fn new(state: MutexGuard<'a, ViewState>, published: &'a RwLock<StateSnapshot>) -> Self {
        Self { state, published }
    }
}

impl Deref for StateGuard<'_> {
    type Target = ViewState;

    fn deref(&self) -> &ViewState {
        &self.state
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut ViewState {
        &mut self.state
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        // Still holding the commit lock, so publishes never reorder
        let snapshot = StateSnapshot::of(&self.state);
        *self.published.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}
