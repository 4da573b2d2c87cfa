//! Shared delivery entrypoint used by the CLI and the worker.

use frontdesk_core::{RecordId, RecordStore, SyncStatus, SyncableRecord};

use crate::client::RecordSink;
use crate::outcome::SyncOutcome;
use crate::tracker;
use crate::SyncError;

/// Deliver one record and persist the outcome.
///
/// A delivery failure is returned as `Ok(SyncOutcome::Failed(..))`; only a
/// store error while recording the outcome is an `Err`.
pub fn sync_record<S: RecordSink + ?Sized>(
    store: &RecordStore,
    sink: &S,
    record: &SyncableRecord,
) -> Result<SyncOutcome, SyncError> {
    let outcome = sink.deliver(record);
    tracker::record_outcome(store, record, &outcome)?;
    Ok(outcome)
}

/// Result of a manual retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryResult {
    /// The record was already delivered and `force` was not set.
    AlreadySynced(SyncableRecord),
    /// A delivery was attempted; `record` is the state after recording it.
    Attempted {
        record: SyncableRecord,
        outcome: SyncOutcome,
    },
}

/// Retry one record by id, looking it up in both tables.
pub fn retry<S: RecordSink + ?Sized>(
    store: &RecordStore,
    sink: &S,
    id: &RecordId,
    force: bool,
) -> Result<RetryResult, SyncError> {
    let record = store
        .find(id)?
        .ok_or_else(|| SyncError::UnknownRecord(id.clone()))?;

    if record.envelope().status == SyncStatus::Success && !force {
        tracing::info!("{} {} already synced; not resending", record.kind().noun(), id);
        return Ok(RetryResult::AlreadySynced(record));
    }

    tracing::info!("retrying {} {}", record.kind().noun(), id);
    let outcome = sync_record(store, sink, &record)?;
    let record = store.get(record.kind(), id)?;
    Ok(RetryResult::Attempted { record, outcome })
}
