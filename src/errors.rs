//! View error types
//!
//! Every failure surfaced by a view carries a stable code, a severity, a
//! message and (where known) the key and sequence it concerns.
//!
//! Error codes:
//! - VIEW_NOT_FOUND (ERROR)
//! - VIEW_STORAGE_IO (ERROR)
//! - VIEW_CLOSED_WHILE_BUILDING (ERROR)
//! - VIEW_LOG_RESOLUTION (ERROR)
//! - VIEW_CLOSED (ERROR)
//! - VIEW_SINK_RESET (ERROR)
//! - VIEW_REBUILD_INCOMPLETE (ERROR)
//! - VIEW_INVALID_OPTIONS (ERROR)
//! - VIEW_INVALID_CONFIG (ERROR)
//! - VIEW_ENCODING (ERROR)
//! - VIEW_CORRUPTION (FATAL)

use std::error::Error as StdError;
use std::fmt;

use crate::key::{KeyError, ViewKey};
use crate::log::{LogError, Seq};
use crate::store::StoreError;

/// Severity levels for view errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, view stays usable
    Error,
    /// Persisted state cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Key absent from the index, or its log entry was purged
    NotFound,
    /// Underlying store failure
    StorageIo,
    /// A flush was attempted after close was requested
    ClosedWhileBuilding,
    /// The log failed for a reason other than deletion
    LogResolution,
    /// Operation on a closed view
    Closed,
    /// A destroy invalidated the sink that assembled this batch
    SinkReset,
    /// A previous clear failed; commits are refused until it succeeds
    RebuildIncomplete,
    InvalidOptions,
    InvalidConfig,
    /// A record could not be serialized for storage
    Encoding,
    /// A persisted record could not be decoded
    Corruption,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "VIEW_NOT_FOUND",
            ErrorCode::StorageIo => "VIEW_STORAGE_IO",
            ErrorCode::ClosedWhileBuilding => "VIEW_CLOSED_WHILE_BUILDING",
            ErrorCode::LogResolution => "VIEW_LOG_RESOLUTION",
            ErrorCode::Closed => "VIEW_CLOSED",
            ErrorCode::SinkReset => "VIEW_SINK_RESET",
            ErrorCode::RebuildIncomplete => "VIEW_REBUILD_INCOMPLETE",
            ErrorCode::InvalidOptions => "VIEW_INVALID_OPTIONS",
            ErrorCode::InvalidConfig => "VIEW_INVALID_CONFIG",
            ErrorCode::Encoding => "VIEW_ENCODING",
            ErrorCode::Corruption => "VIEW_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::Corruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// View error with full context
#[derive(Debug)]
pub struct ViewError {
    code: ErrorCode,
    message: String,
    key: Option<ViewKey>,
    seq: Option<Seq>,
    details: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ViewError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: None,
            seq: None,
            details: None,
            source: None,
        }
    }

    /// Key absent from the index
    pub fn not_found(key: impl Into<ViewKey>) -> Self {
        let mut err = Self::new(ErrorCode::NotFound, "key not found");
        err.key = Some(key.into());
        err
    }

    /// The index pointed at a log entry that has been purged.
    pub fn stale_pointer(key: impl Into<ViewKey>, seq: Seq, source: LogError) -> Self {
        let mut err = Self::new(ErrorCode::NotFound, "index pointed at a deleted log entry");
        err.key = Some(key.into());
        err.seq = Some(seq);
        err.source = Some(Box::new(source));
        err
    }

    pub fn storage(message: impl Into<String>, source: StoreError) -> Self {
        let mut err = Self::new(ErrorCode::StorageIo, message);
        err.source = Some(Box::new(source));
        err
    }

    pub fn log_resolution(key: impl Into<ViewKey>, seq: Seq, source: LogError) -> Self {
        let mut err = Self::new(ErrorCode::LogResolution, "index pointed at a log entry the log failed to read");
        err.key = Some(key.into());
        err.seq = Some(seq);
        err.source = Some(Box::new(source));
        err
    }

    pub fn closed_while_building() -> Self {
        Self::new(ErrorCode::ClosedWhileBuilding, "view closed while index was building")
    }

    pub fn closed() -> Self {
        Self::new(ErrorCode::Closed, "view is closed")
    }

    pub fn sink_reset() -> Self {
        Self::new(
            ErrorCode::SinkReset,
            "view was reset after this sink was created; replay from the cursor",
        )
    }

    pub fn rebuild_incomplete() -> Self {
        Self::new(
            ErrorCode::RebuildIncomplete,
            "previous clear did not complete; destroy must succeed before writing",
        )
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOptions, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    pub fn encoding(key: Option<ViewKey>, source: serde_json::Error) -> Self {
        let mut err = Self::new(ErrorCode::Encoding, "record could not be encoded");
        err.key = key;
        err.source = Some(Box::new(source));
        err
    }

    /// A stored record could not be decoded.
    pub fn corruption(
        key: Option<ViewKey>,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        let mut err = Self::new(ErrorCode::Corruption, message);
        err.key = key;
        err.source = Some(Box::new(source));
        err
    }

    /// Undecodable key bytes.
    pub fn corrupt_key(source: KeyError) -> Self {
        Self::corruption(None, "stored key could not be decoded", source)
    }

    /// Attach the key this error concerns.
    pub fn with_key(mut self, key: impl Into<ViewKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach the log sequence this error concerns.
    pub fn with_seq(mut self, seq: Seq) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Attach free-form context (for example the log's head position).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn key(&self) -> Option<&ViewKey> {
        self.key.as_ref()
    }

    /// Sequence the error concerns. For a stale pointer this is the purged seq.
    pub fn seq(&self) -> Option<Seq> {
        self.seq
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// True for the NotFound raised when the log entry behind a pointer is gone.
    pub fn is_stale_pointer(&self) -> bool {
        self.code == ErrorCode::NotFound && self.seq.is_some()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref key) = self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(seq) = self.seq {
            write!(f, " (seq: {})", seq)?;
        }
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for ViewError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for view operations
pub type ViewResult<T> = Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::NotFound.code(), "VIEW_NOT_FOUND");
        assert_eq!(ErrorCode::StorageIo.code(), "VIEW_STORAGE_IO");
        assert_eq!(ErrorCode::ClosedWhileBuilding.code(), "VIEW_CLOSED_WHILE_BUILDING");
        assert_eq!(ErrorCode::LogResolution.code(), "VIEW_LOG_RESOLUTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(ViewError::corrupt_key(KeyError::Empty).is_fatal());
        assert!(!ViewError::closed_while_building().is_fatal());
        assert!(!ViewError::not_found(Key::from(1)).is_fatal());
    }

    #[test]
    fn test_stale_pointer_carries_seq() {
        let err = ViewError::stale_pointer(Key::from("k"), 42, LogError::Deleted(42));
        assert!(err.is_not_found());
        assert!(err.is_stale_pointer());
        assert_eq!(err.seq(), Some(42));

        let plain = ViewError::not_found(Key::from("k"));
        assert!(plain.is_not_found());
        assert!(!plain.is_stale_pointer());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ViewError::log_resolution(Key::from("k"), 7, LogError::Read("disk".into()))
            .with_details("log since: 9");
        let display = err.to_string();
        assert!(display.contains("VIEW_LOG_RESOLUTION"));
        assert!(display.contains("\"k\""));
        assert!(display.contains("seq: 7"));
        assert!(display.contains("log since: 9"));
        assert!(display.contains("disk"));
    }

    #[test]
    fn test_source_is_exposed() {
        let err = ViewError::storage("commit", StoreError::Injected("boom".into()));
        assert!(err.source().is_some());
        assert_eq!(err.code(), ErrorCode::StorageIo);
    }
}
