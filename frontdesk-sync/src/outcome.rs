//! Result of a single delivery attempt.

use std::fmt;

use frontdesk_core::RecordKind;
use thiserror::Error;

/// What happened when one record was sent to the spreadsheet endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The endpoint answered 200.
    Delivered,
    Failed(SyncFailure),
}

/// Why a delivery did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailure {
    /// No endpoint configured for this record kind. Retrying is harmless but
    /// pointless until configuration changes.
    #[error("{kind} webhook URL not configured")]
    NotConfigured { kind: RecordKind },

    #[error("webhook request timed out")]
    Timeout,

    /// Connection refused, DNS failure, TLS error and similar.
    #[error("request error: {0}")]
    Transport(String),

    /// The endpoint answered with something other than 200.
    #[error("remote returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Anything else: payload encoding, unreadable response, a panic in the attempt.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl SyncFailure {
    /// `false` only for configuration problems.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncFailure::NotConfigured { .. })
    }
}

impl SyncOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SyncOutcome::Delivered)
    }

    /// Error text to store as `last_error`, if any.
    pub fn error_message(&self) -> Option<String> {
        match self {
            SyncOutcome::Delivered => None,
            SyncOutcome::Failed(failure) => Some(failure.to_string()),
        }
    }

    /// `(success, error)` pair.
    pub fn into_parts(self) -> (bool, Option<String>) {
        let error = self.error_message();
        (self.is_delivered(), error)
    }
}

impl From<SyncFailure> for SyncOutcome {
    fn from(failure: SyncFailure) -> Self {
        SyncOutcome::Failed(failure)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Delivered => write!(f, "delivered"),
            SyncOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}
