//! View startup and reset
//!
//! # Startup Sequence (strict order)
//!
//! 1. Read the metadata record
//! 2. No metadata, empty store: fresh view, cursor stays at the sentinel
//! 3. No metadata, non-empty store: an earlier clear was interrupted; finish it
//! 4. Matching schema version: publish the stored `since` and resume
//! 5. Different schema version: reset the cursor, then clear everything
//!
//! Nothing is written by the pipeline until this sequence completes, and a
//! rebuild resets the cursor before the first record is deleted.

use std::fmt;

use crate::cursor::Cursor;
use crate::errors::{ViewError, ViewResult};
use crate::key::ViewKey;
use crate::meta::{MetadataRecord, SchemaVersion};
use crate::observability::{log_event, Event, ViewMetrics};
use crate::store::IndexStore;
use crate::view::{Phase, ViewConfig, ViewState};

use super::clear::{clear_all, ClearStats};

/// Why persisted state is being discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// Stored schema version differs from the requested one
    VersionChanged {
        stored: SchemaVersion,
        requested: SchemaVersion,
    },
    /// Records without metadata: a previous clear stopped part-way
    InterruptedClear,
    /// Explicit destroy
    Destroy,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::VersionChanged { stored, requested } => {
                write!(f, "schema version changed from {} to {}", stored, requested)
            }
            RebuildReason::InterruptedClear => write!(f, "interrupted clear"),
            RebuildReason::Destroy => write!(f, "destroy"),
        }
    }
}

/// How a view came up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// Nothing persisted
    Fresh,
    /// Metadata matched; indexing continues after `since`
    Resumed { since: u64 },
    /// Persisted state was discarded
    Rebuilt {
        reason: RebuildReason,
        stats: ClearStats,
    },
}

/// Runs the startup sequence and rebuilds for one view.
pub struct RecoveryManager<'a> {
    view: &'a str,
    store: &'a dyn IndexStore,
    cursor: &'a Cursor,
    config: &'a ViewConfig,
    metrics: &'a ViewMetrics,
}

impl<'a> RecoveryManager<'a> {
    pub fn new(
        view: &'a str,
        store: &'a dyn IndexStore,
        cursor: &'a Cursor,
        config: &'a ViewConfig,
        metrics: &'a ViewMetrics,
    ) -> Self {
        Self {
            view,
            store,
            cursor,
            config,
            metrics,
        }
    }

    /// Read and decode the stored metadata record, if any.
    pub fn load_meta(&self) -> ViewResult<Option<MetadataRecord>> {
        let raw = self
            .store
            .get(&ViewKey::Meta.encode())
            .map_err(|e| ViewError::storage("failed to read view metadata", e))?;
        raw.map(|bytes| {
            MetadataRecord::decode(&bytes).map_err(|e| {
                ViewError::corruption(Some(ViewKey::Meta), "metadata record could not be decoded", e)
            })
        })
        .transpose()
    }

    /// Execute the startup sequence. Caller holds the commit lock.
    pub(crate) fn recover(&self, state: &mut ViewState) -> ViewResult<Startup> {
        state.phase = Phase::Uninitialized;

        match self.load_meta()? {
            None => {
                let empty = self
                    .store
                    .is_empty()
                    .map_err(|e| ViewError::storage("failed to inspect view store", e))?;
                if empty {
                    state.phase = Phase::Resuming;
                    state.meta = None;
                    state.phase = Phase::Ready;
                    log_event(Event::ViewFresh, &[("view", self.view)]);
                    Ok(Startup::Fresh)
                } else {
                    self.rebuild(state, RebuildReason::InterruptedClear)
                }
            }
            Some(meta) if meta.schema_version == self.config.schema_version => {
                state.phase = Phase::Resuming;
                let since = meta.since;
                self.cursor.publish(since);
                state.meta = Some(meta);
                state.phase = Phase::Ready;
                log_event(
                    Event::ViewResumed,
                    &[("view", self.view), ("since", &since.to_string())],
                );
                Ok(Startup::Resumed { since })
            }
            Some(meta) => {
                state.outdated = true;
                self.rebuild(
                    state,
                    RebuildReason::VersionChanged {
                        stored: meta.schema_version,
                        requested: self.config.schema_version.clone(),
                    },
                )
            }
        }
    }

    /// Discard every persisted record. Caller holds the commit lock.
    ///
    /// On failure the view stays in `Rebuilding` and refuses commits until a
    /// later rebuild succeeds.
    pub(crate) fn rebuild(
        &self,
        state: &mut ViewState,
        reason: RebuildReason,
    ) -> ViewResult<Startup> {
        let reason_text = reason.to_string();
        log_event(
            Event::RebuildStart,
            &[("view", self.view), ("reason", &reason_text)],
        );

        self.cursor.reset();
        state.epoch += 1;
        state.meta = None;
        if !state.phase.is_closing() {
            state.phase = Phase::Rebuilding;
        }
        self.metrics.increment_rebuilds();

        match clear_all(self.store, self.config.clear_chunk_size) {
            Ok(stats) => {
                if state.phase == Phase::Rebuilding {
                    state.phase = Phase::Ready;
                }
                log_event(
                    Event::RebuildComplete,
                    &[
                        ("view", self.view),
                        ("reason", &reason_text),
                        ("records_removed", &stats.records_removed.to_string()),
                    ],
                );
                Ok(Startup::Rebuilt { reason, stats })
            }
            Err(e) => {
                log_event(
                    Event::RebuildFailed,
                    &[
                        ("view", self.view),
                        ("reason", &reason_text),
                        ("error", &e.to_string()),
                    ],
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::key::Key;
    use crate::meta::CursorRecord;
    use crate::store::{BatchOp, MemoryStore};

    fn seed(store: &MemoryStore, version: SchemaVersion, since: u64, records: u64) {
        let mut ops = vec![
            BatchOp::Put {
                key: ViewKey::Meta.encode(),
                value: MetadataRecord::new(version, since).encode().unwrap(),
            },
            BatchOp::Put {
                key: ViewKey::Cursor.encode(),
                value: CursorRecord { since }.encode().unwrap(),
            },
        ];
        for i in 0..records {
            ops.push(BatchOp::Put {
                key: ViewKey::User(Key::from(i as u32)).encode(),
                value: b"{\"seq\":0}".to_vec(),
            });
        }
        store.write_batch(ops).unwrap();
    }

    struct Fixture {
        store: MemoryStore,
        cursor: Cursor,
        config: ViewConfig,
        metrics: ViewMetrics,
    }

    impl Fixture {
        fn new(version: i64) -> Self {
            Self {
                store: MemoryStore::new(),
                cursor: Cursor::new(),
                config: ViewConfig::new(version).with_clear_chunk_size(2),
                metrics: ViewMetrics::new(),
            }
        }

        fn manager(&self) -> RecoveryManager<'_> {
            RecoveryManager::new("test", &self.store, &self.cursor, &self.config, &self.metrics)
        }
    }

    #[test]
    fn test_fresh_store() {
        let fx = Fixture::new(1);
        let mut state = ViewState::new();

        let startup = fx.manager().recover(&mut state).unwrap();
        assert_eq!(startup, Startup::Fresh);
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(fx.cursor.get(), None);
        assert!(state.meta.is_none());
    }

    #[test]
    fn test_matching_version_resumes() {
        let fx = Fixture::new(1);
        seed(&fx.store, SchemaVersion::from(1), 41, 3);
        let mut state = ViewState::new();

        let startup = fx.manager().recover(&mut state).unwrap();
        assert_eq!(startup, Startup::Resumed { since: 41 });
        assert_eq!(fx.cursor.get(), Some(41));
        assert_eq!(state.meta.as_ref().map(|m| m.since), Some(41));
        assert!(!state.outdated);
        assert_eq!(fx.store.len(), 5);
    }

    #[test]
    fn test_version_change_clears_everything() {
        let fx = Fixture::new(2);
        seed(&fx.store, SchemaVersion::from(1), 41, 5);
        let mut state = ViewState::new();

        let startup = fx.manager().recover(&mut state).unwrap();
        match startup {
            Startup::Rebuilt { reason, stats } => {
                assert!(matches!(reason, RebuildReason::VersionChanged { .. }));
                assert_eq!(stats.records_removed, 5);
            }
            other => panic!("unexpected startup: {:?}", other),
        }
        assert!(state.outdated);
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.epoch, 1);
        assert_eq!(fx.cursor.get(), None);
        assert!(fx.store.is_empty().unwrap());
        assert_eq!(fx.metrics.snapshot().rebuilds, 1);
    }

    #[test]
    fn test_residual_records_without_metadata_are_cleared() {
        let fx = Fixture::new(1);
        seed(&fx.store, SchemaVersion::from(1), 9, 4);
        fx.store
            .write_batch(vec![BatchOp::Delete {
                key: ViewKey::Meta.encode(),
            }])
            .unwrap();
        let mut state = ViewState::new();

        let startup = fx.manager().recover(&mut state).unwrap();
        assert!(matches!(
            startup,
            Startup::Rebuilt {
                reason: RebuildReason::InterruptedClear,
                ..
            }
        ));
        assert!(fx.store.is_empty().unwrap());
        assert!(!state.outdated);
    }

    #[test]
    fn test_failed_clear_leaves_view_rebuilding() {
        let fx = Fixture::new(2);
        seed(&fx.store, SchemaVersion::from(1), 41, 5);
        fx.store.fail_batches_after(1, 1);
        let mut state = ViewState::new();

        let err = fx.manager().recover(&mut state).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StorageIo);
        assert_eq!(state.phase, Phase::Rebuilding);
        assert_eq!(fx.cursor.get(), None);
        // Metadata is gone, so the next open finishes the clear
        assert_eq!(fx.manager().load_meta().unwrap(), None);
    }

    #[test]
    fn test_corrupt_metadata_is_fatal() {
        let fx = Fixture::new(1);
        fx.store
            .write_batch(vec![BatchOp::Put {
                key: ViewKey::Meta.encode(),
                value: b"garbage".to_vec(),
            }])
            .unwrap();
        let mut state = ViewState::new();

        let err = fx.manager().recover(&mut state).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.key(), Some(&ViewKey::Meta));
    }
}
