//! # frontdesk-sync
//!
//! Delivery of stored records to the remote spreadsheet webhooks.
//!
//! [`WebhookClient::sync`] sends one record and always resolves to a
//! [`SyncOutcome`]. [`attempt::sync_record`] pairs a delivery with
//! [`tracker::record_outcome`] and is the entrypoint for the inline path,
//! manual retries and the reconciliation worker.

pub mod attempt;
pub mod client;
pub mod error;
pub mod notify;
pub mod outcome;
pub mod payload;
pub mod tracker;

pub use attempt::{retry, sync_record, RetryResult};
pub use client::{RecordSink, WebhookClient};
pub use error::SyncError;
pub use notify::ChatNotifier;
pub use outcome::{SyncFailure, SyncOutcome};
pub use payload::RowPayload;
