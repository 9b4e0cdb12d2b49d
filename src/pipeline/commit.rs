//! Atomic batch commit
//!
//! Runs under the commit lock. Index records, metadata and cursor go to the
//! store as one batch; the in-memory metadata and the published cursor only
//! change after that batch succeeds.

use crate::errors::{ViewError, ViewResult};
use crate::log::Seq;
use crate::meta::MetadataRecord;
use crate::observability::{log_event, Event, Logger};
use crate::view::{Phase, ViewInner};

use super::batch::PendingBatch;

/// Result of one committed batch, passed to the sink's drain callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Cursor value after the commit
    pub since: Seq,
    /// Log entries folded into the batch
    pub entries: usize,
    /// Distinct index records written or deleted
    pub records: usize,
}

pub(crate) fn commit(inner: &ViewInner, batch: PendingBatch) -> ViewResult<FlushReport> {
    let mut state = inner.lock_state();

    if state.phase.is_closing() {
        return Err(ViewError::closed_while_building());
    }
    if state.epoch != batch.epoch() {
        return Err(ViewError::sink_reset());
    }
    if state.phase == Phase::Rebuilding {
        return Err(ViewError::rebuild_incomplete());
    }

    let (Some(first_seq), Some(max_seq)) = (batch.first_seq(), batch.max_seq()) else {
        return Err(ViewError::invalid_options("cannot commit an empty batch"));
    };

    let mut meta = state
        .meta
        .clone()
        .unwrap_or_else(|| MetadataRecord::new(inner.config.schema_version.clone(), first_seq));
    meta.fold(max_seq);
    meta.continuation = batch.continuation().cloned();

    let entries = batch.entries();
    let records = batch.records();
    let ops = batch.into_ops(&meta)?;

    if let Err(e) = inner.store()?.write_batch(ops) {
        inner.metrics.increment_commit_failures();
        let err = ViewError::storage("batch commit failed", e).with_seq(max_seq);
        log_event(
            Event::BatchFailed,
            &[
                ("view", inner.name.as_str()),
                ("seq", &max_seq.to_string()),
                ("error", &err.to_string()),
            ],
        );
        return Err(err);
    }

    let since = meta.since;
    state.meta = Some(meta);
    inner.cursor.publish(since);
    inner.metrics.record_commit(records as u64);

    Logger::trace(
        Event::BatchCommit.as_str(),
        &[
            ("view", inner.name.as_str()),
            ("since", &since.to_string()),
            ("entries", &entries.to_string()),
            ("records", &records.to_string()),
        ],
    );

    Ok(FlushReport {
        since,
        entries,
        records,
    })
}
