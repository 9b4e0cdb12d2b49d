//! Key codec errors

use thiserror::Error;

/// Result type for key encoding and decoding
pub type KeyResult<T> = Result<T, KeyError>;

/// Failures while building keys or decoding persisted key bytes.
///
/// Encoding never fails; only bytes read back from the store can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty key")]
    Empty,

    #[error("unknown key tag 0x{tag:02x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("truncated key at byte {0}")]
    Truncated(usize),

    #[error("invalid utf-8 in text key at byte {0}")]
    InvalidText(usize),

    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("trailing bytes after key at byte {0}")]
    Trailing(usize),

    #[error("integer {0} is not exactly representable as a key")]
    UnsafeInteger(i128),
}
