//! Ordered store errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the underlying ordered key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    /// Raised by snapshot reads, which go straight to the LSM tree.
    #[error("lsm tree error: {0}")]
    Lsm(#[from] fjall::LsmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised by [`MemoryStore`](super::MemoryStore) failure injection.
    #[error("injected failure: {0}")]
    Injected(String),
}
