//! Write sink
//!
//! A sink consumes log entries in order, maps them through the transform's
//! stage and commits them in batches. A batch is flushed when it reaches the
//! configured size, when the input has nothing more ready, or when the stage
//! emits [`Extraction::Sync`].
//!
//! One sink writes at a time: `run` waits for the previous sink to finish.

use std::fmt;
use std::sync::Arc;

use futures_util::{pin_mut, Stream, StreamExt};
use tokio::sync::watch;

use crate::errors::{ViewError, ViewResult};
use crate::log::{LogEntry, Seq};
use crate::observability::{log_event, Event};
use crate::view::{offload, ViewInner};

use super::batch::PendingBatch;
use super::commit::{commit, FlushReport};
use super::extraction::{Extraction, Stage};

/// Called after every flush, successful or not, and when the sink aborts.
pub type DrainCallback = Box<dyn FnMut(Result<&FlushReport, &ViewError>) + Send>;

/// Totals for one `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub batches: usize,
    pub entries: usize,
    /// Cursor after the last committed batch
    pub since: Option<Seq>,
}

pub struct Sink {
    inner: Arc<ViewInner>,
    stage: Box<dyn Stage>,
    epoch: u64,
    on_drained: DrainCallback,
}

impl Sink {
    pub(crate) fn new(
        inner: Arc<ViewInner>,
        stage: Box<dyn Stage>,
        epoch: u64,
        on_drained: DrainCallback,
    ) -> Self {
        Self {
            inner,
            stage,
            epoch,
            on_drained,
        }
    }

    /// Consume `entries` until the stream ends, a commit fails or the view is
    /// closed.
    ///
    /// Entries must arrive in strictly increasing sequence order, starting
    /// after the view's cursor.
    pub async fn run<S>(mut self, entries: S) -> ViewResult<SinkReport>
    where
        S: Stream<Item = LogEntry>,
    {
        let inner = Arc::clone(&self.inner);
        let mut closing = inner.closing.subscribe();

        let _writer = tokio::select! {
            biased;
            _ = close_requested(&mut closing) => return Err(self.abort()),
            guard = Arc::clone(&inner.writer).lock_owned() => guard,
        };

        let chunks = entries.ready_chunks(inner.config.batch_size);
        pin_mut!(chunks);

        let mut report = SinkReport::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = close_requested(&mut closing) => return Err(self.abort()),
                next = chunks.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };

            let mut batch = PendingBatch::new(self.epoch);
            for entry in chunk {
                match self.stage.map(entry) {
                    Extraction::Sync => {
                        let ready = std::mem::replace(&mut batch, PendingBatch::new(self.epoch));
                        self.flush(ready, &mut report).await?;
                    }
                    extraction => batch.push(extraction),
                }
            }
            self.flush(batch, &mut report).await?;
        }

        Ok(report)
    }

    async fn flush(&mut self, batch: PendingBatch, report: &mut SinkReport) -> ViewResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        let result = offload(move || commit(&inner, batch), ViewError::closed_while_building).await;
        (self.on_drained)(result.as_ref());

        let flushed = result?;
        report.batches += 1;
        report.entries += flushed.entries;
        report.since = Some(flushed.since);
        Ok(())
    }

    fn abort(&mut self) -> ViewError {
        log_event(Event::SinkAborted, &[("view", self.inner.name.as_str())]);
        let err = ViewError::closed_while_building();
        (self.on_drained)(Err(&err));
        err
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("view", &self.inner.name)
            .field("epoch", &self.epoch)
            .finish()
    }
}

async fn close_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closing| *closing).await;
}
