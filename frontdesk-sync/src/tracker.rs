//! Persist the outcome of a delivery attempt onto the record's envelope.

use frontdesk_core::{RecordStore, StoreError, SyncStatus, SyncableRecord};

use crate::outcome::SyncOutcome;

/// Write `outcome` for `record` and return the status it should now carry.
///
/// A failure against a record that already reached `success` is ignored by
/// the store, so the returned status is only what this attempt asked for.
pub fn record_outcome(
    store: &RecordStore,
    record: &SyncableRecord,
    outcome: &SyncOutcome,
) -> Result<SyncStatus, StoreError> {
    let kind = record.kind();
    match outcome {
        SyncOutcome::Delivered => {
            store.record_success(kind, record.id())?;
            Ok(SyncStatus::Success)
        }
        SyncOutcome::Failed(failure) => {
            store.record_failure(kind, record.id(), &failure.to_string())?;
            Ok(SyncStatus::Failed)
        }
    }
}
