//! Lifecycle events emitted by a view

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Open started
    ViewOpen,
    /// Stored metadata matched; resuming from its cursor
    ViewResumed,
    /// No metadata; starting from sequence 0
    ViewFresh,
    /// Close requested
    ViewClose,
    /// Explicit destroy requested
    ViewDestroy,

    // Rebuild
    RebuildStart,
    RebuildComplete,
    RebuildFailed,

    // Write pipeline
    BatchCommit,
    BatchFailed,
    /// Sink stopped because close was requested
    SinkAborted,

    // Read projector
    StalePointerHealed,
    StalePointerCleanupFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ViewOpen => "VIEW_OPEN",
            Event::ViewResumed => "VIEW_RESUMED",
            Event::ViewFresh => "VIEW_FRESH",
            Event::ViewClose => "VIEW_CLOSE",
            Event::ViewDestroy => "VIEW_DESTROY",
            Event::RebuildStart => "REBUILD_START",
            Event::RebuildComplete => "REBUILD_COMPLETE",
            Event::RebuildFailed => "REBUILD_FAILED",
            Event::BatchCommit => "BATCH_COMMIT",
            Event::BatchFailed => "BATCH_FAILED",
            Event::SinkAborted => "SINK_ABORTED",
            Event::StalePointerHealed => "STALE_POINTER_HEALED",
            Event::StalePointerCleanupFailed => "STALE_POINTER_CLEANUP_FAILED",
        }
    }

    /// Events reporting a failure are logged at ERROR.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RebuildFailed | Event::BatchFailed | Event::StalePointerCleanupFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        for event in [Event::ViewOpen, Event::BatchCommit, Event::StalePointerHealed] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failures() {
        assert!(Event::BatchFailed.is_failure());
        assert!(!Event::BatchCommit.is_failure());
    }
}
