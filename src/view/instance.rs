//! View handle and shared internals

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, TryLockError};

use tokio::sync::watch;

use crate::cursor::Cursor;
use crate::errors::{ViewError, ViewResult};
use crate::key::Key;
use crate::log::Log;
use crate::meta::{MetadataRecord, SchemaVersion};
use crate::observability::{log_event, Event, MetricsSnapshot, ViewMetrics};
use crate::pipeline::{DrainCallback, FlushReport, Sink, Transform};
use crate::projector::{self, Lookup, ReadOptions, Scan};
use crate::recovery::{RebuildReason, RecoveryManager, Startup};
use crate::store::{FjallStore, IndexStore};

use super::config::ViewConfig;
use super::state::{Phase, StateGuard, StateSnapshot, ViewState};

/// Shared by the view handle, its sinks and in-flight commits.
pub(crate) struct ViewInner {
    pub name: String,
    pub config: ViewConfig,
    pub log: Arc<dyn Log>,
    pub transform: Arc<dyn Transform>,
    /// Taken out on close
    store: RwLock<Option<Arc<dyn IndexStore>>>,
    pub cursor: Cursor,
    pub metrics: ViewMetrics,
    /// Serializes sinks
    pub writer: Arc<tokio::sync::Mutex<()>>,
    /// Set once close is requested
    pub closing: watch::Sender<bool>,
    state: Mutex<ViewState>,
    /// What readers see of `state`
    published: RwLock<StateSnapshot>,
}

impl ViewInner {
    /// Commit lock.
    pub fn lock_state(&self) -> StateGuard<'_> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        StateGuard::new(state, &self.published)
    }

    /// Commit lock, unless a commit or rebuild holds it right now.
    pub fn try_lock_state(&self) -> Option<StateGuard<'_>> {
        let state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(StateGuard::new(state, &self.published))
    }

    /// State as of the last released commit lock.
    pub fn snapshot(&self) -> StateSnapshot {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The open store; `VIEW_CLOSED` once close has released it.
    pub fn store(&self) -> ViewResult<Arc<dyn IndexStore>> {
        self.store
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(ViewError::closed)
    }

    fn release_store(&self) -> Option<Arc<dyn IndexStore>> {
        self.store.write().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn recovery<'a>(&'a self, store: &'a dyn IndexStore) -> RecoveryManager<'a> {
        RecoveryManager::new(&self.name, store, &self.cursor, &self.config, &self.metrics)
    }
}

/// Run blocking store work off the async executor.
pub(crate) async fn offload<T, F>(f: F, on_cancel: fn() -> ViewError) -> ViewResult<T>
where
    F: FnOnce() -> ViewResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        // Runtime shutting down
        Err(_) => Err(on_cancel()),
    }
}

/// Entry point: bind a schema version and a transform.
pub fn create_view<T>(schema_version: impl Into<SchemaVersion>, transform: T) -> ViewFactory
where
    T: Transform + 'static,
{
    ViewFactory::new(ViewConfig::new(schema_version), transform)
}

/// Opens views that share one configuration and transform.
#[derive(Clone)]
pub struct ViewFactory {
    config: ViewConfig,
    transform: Arc<dyn Transform>,
}

impl ViewFactory {
    pub fn new<T>(config: ViewConfig, transform: T) -> Self
    where
        T: Transform + 'static,
    {
        Self {
            config,
            transform: Arc::new(transform),
        }
    }

    /// Replace the configuration, schema version included.
    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Open (or create) the view `name` in a store under the log's directory.
    pub fn open(&self, log: Arc<dyn Log>, name: &str) -> ViewResult<View> {
        self.config.validate()?;
        let dir = log
            .directory()
            .ok_or_else(|| ViewError::invalid_config("log does not expose a directory"))?;
        let path: PathBuf = dir.join(name);
        let store = FjallStore::open(&path, self.config.durability)
            .map_err(|e| ViewError::storage(format!("failed to open store at {}", path.display()), e))?;
        self.open_with_store(log, name, Arc::new(store))
    }

    /// Open the view over a caller-supplied store.
    pub fn open_with_store(
        &self,
        log: Arc<dyn Log>,
        name: &str,
        store: Arc<dyn IndexStore>,
    ) -> ViewResult<View> {
        self.config.validate()?;
        log_event(
            Event::ViewOpen,
            &[
                ("view", name),
                ("schema_version", &self.config.schema_version.to_string()),
            ],
        );

        let (closing, _) = watch::channel(false);
        let inner = Arc::new(ViewInner {
            name: name.to_string(),
            config: self.config.clone(),
            log,
            transform: Arc::clone(&self.transform),
            store: RwLock::new(Some(Arc::clone(&store))),
            cursor: Cursor::new(),
            metrics: ViewMetrics::new(),
            writer: Arc::new(tokio::sync::Mutex::new(())),
            closing,
            state: Mutex::new(ViewState::new()),
            published: RwLock::new(StateSnapshot::of(&ViewState::new())),
        });

        let startup = {
            let mut state = inner.lock_state();
            inner.recovery(store.as_ref()).recover(&mut state)?
        };

        Ok(View { inner, startup })
    }
}

impl fmt::Debug for ViewFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFactory")
            .field("config", &self.config)
            .finish()
    }
}

/// A materialized index over one log.
///
/// Cheap to clone; clones share the same store, cursor and state.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
    startup: Startup,
}

impl View {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// How the view came up at open.
    pub fn startup(&self) -> &Startup {
        &self.startup
    }

    /// Highest log seq fully indexed; `None` while uninitialized or
    /// rebuilding.
    pub fn since(&self) -> &Cursor {
        &self.inner.cursor
    }

    pub fn phase(&self) -> Phase {
        self.inner.snapshot().phase
    }

    /// Stored schema version differed from the requested one at open.
    pub fn is_outdated(&self) -> bool {
        self.inner.snapshot().outdated
    }

    /// Last committed metadata.
    pub fn meta(&self) -> Option<MetadataRecord> {
        self.inner.snapshot().meta
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// A sink that writes log entries into this view.
    ///
    /// Feed it entries after [`since`](Self::since). The transform's stage
    /// is built from the metadata as it stands now.
    pub fn create_sink<F>(&self, on_drained: F) -> ViewResult<Sink>
    where
        F: FnMut(Result<&FlushReport, &ViewError>) + Send + 'static,
    {
        let (meta, epoch) = {
            let state = self.inner.lock_state();
            if state.phase.is_closing() {
                return Err(ViewError::closed());
            }
            (state.meta.clone(), state.epoch)
        };
        let stage = self.inner.transform.stage(meta.as_ref());
        let on_drained: DrainCallback = Box::new(on_drained);
        Ok(Sink::new(Arc::clone(&self.inner), stage, epoch, on_drained))
    }

    /// Point lookup. Pointer-style records are resolved against the log.
    ///
    /// Never waits for an in-flight commit.
    pub fn get(&self, key: impl Into<Key>) -> ViewResult<Lookup> {
        let store = self.inner.store()?;
        projector::get(&self.inner, store.as_ref(), key.into())
    }

    /// Lazy range scan over a snapshot of the index.
    pub fn read(&self, options: ReadOptions) -> ViewResult<Scan<'_>> {
        let store = self.inner.store()?;
        let projection = options.projection()?;
        let iter = store.scan(options.range(), options.reverse);
        Ok(Scan::new(
            &self.inner,
            store,
            iter,
            projection,
            options.include_internal,
            options.limit,
        ))
    }

    /// Stop the active sink, flush and release the store, refuse further
    /// work.
    ///
    /// Idempotent. Scans started before the close keep their snapshot.
    pub async fn close(&self) -> ViewResult<()> {
        {
            let mut state = self.inner.lock_state();
            if state.phase == Phase::Closed {
                return Ok(());
            }
            state.phase = Phase::Closing;
        }
        log_event(Event::ViewClose, &[("view", self.inner.name.as_str())]);
        self.inner.closing.send_replace(true);

        // Waits for the active sink, if any, to stop
        let _writer = self.inner.writer.lock().await;

        let flushed = match self.inner.store() {
            Ok(store) => {
                offload(
                    move || {
                        store
                            .flush()
                            .map_err(|e| ViewError::storage("failed to flush store on close", e))
                    },
                    ViewError::closed,
                )
                .await
            }
            // A concurrent close already released it
            Err(_) => Ok(()),
        };

        self.inner.lock_state().phase = Phase::Closed;
        drop(self.inner.release_store());
        flushed
    }

    /// Delete every record and reset the cursor to the sentinel.
    ///
    /// Sinks created before the destroy fail their next commit with
    /// `VIEW_SINK_RESET`. Safe to repeat; a failed destroy leaves the view
    /// refusing commits until a later one succeeds.
    pub async fn destroy(&self) -> ViewResult<()> {
        log_event(Event::ViewDestroy, &[("view", self.inner.name.as_str())]);
        let inner = Arc::clone(&self.inner);
        offload(
            move || {
                let store = inner.store()?;
                let mut state = inner.lock_state();
                inner
                    .recovery(store.as_ref())
                    .rebuild(&mut state, RebuildReason::Destroy)
                    .map(|_| ())
            },
            ViewError::closed,
        )
        .await
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.inner.name)
            .field("phase", &self.phase())
            .field("since", &self.inner.cursor.get())
            .finish()
    }
}
