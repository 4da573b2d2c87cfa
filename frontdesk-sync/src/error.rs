//! Error types for frontdesk-sync.
//!
//! Delivery problems are never errors here: they are reported as
//! [`SyncOutcome::Failed`](crate::SyncOutcome::Failed). `SyncError` covers
//! the bookkeeping around an attempt.

use thiserror::Error;

use frontdesk_core::{RecordId, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading the record or writing its sync outcome failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No check-in or mail record carries this id.
    #[error("no record with id {0}")]
    UnknownRecord(RecordId),

    /// The chat webhook rejected or never received a notification.
    #[error("chat notification failed: {0}")]
    Notify(#[source] Box<ureq::Error>),
}
