//! View configuration
//!
//! Immutable after open. Can be built in code or deserialized (for example
//! from the host application's config file); every field but the schema
//! version has a default.

use serde::{Deserialize, Serialize};

use crate::errors::{ViewError, ViewResult};
use crate::meta::SchemaVersion;
use crate::store::Durability;

/// Entries per committed batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Records deleted per batch while clearing a view.
pub const DEFAULT_CLEAR_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Stored metadata with a different version triggers a rebuild.
    pub schema_version: SchemaVersion,

    /// Maximum number of log entries folded into one batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of deletes per batch during a clear.
    #[serde(default = "default_clear_chunk_size")]
    pub clear_chunk_size: usize,

    #[serde(default)]
    pub durability: Durability,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_clear_chunk_size() -> usize {
    DEFAULT_CLEAR_CHUNK_SIZE
}

impl ViewConfig {
    pub fn new(schema_version: impl Into<SchemaVersion>) -> Self {
        Self {
            schema_version: schema_version.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            clear_chunk_size: DEFAULT_CLEAR_CHUNK_SIZE,
            durability: Durability::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_clear_chunk_size(mut self, clear_chunk_size: usize) -> Self {
        self.clear_chunk_size = clear_chunk_size;
        self
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn validate(&self) -> ViewResult<()> {
        if self.batch_size == 0 {
            return Err(ViewError::invalid_config("batch_size must be at least 1"));
        }
        if self.clear_chunk_size == 0 {
            return Err(ViewError::invalid_config(
                "clear_chunk_size must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::new(1);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.clear_chunk_size, 1024);
        assert_eq!(config.durability, Durability::Buffer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ViewConfig =
            serde_json::from_str(r#"{"schema_version": "v3", "durability": "sync_all"}"#).unwrap();
        assert_eq!(config.schema_version, SchemaVersion::from("v3"));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.durability, Durability::SyncAll);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let err = ViewConfig::new(1).with_batch_size(0).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);

        let err = ViewConfig::new(1)
            .with_clear_chunk_size(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
    }
}
