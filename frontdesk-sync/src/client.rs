//! HTTP client for the spreadsheet webhooks.
//!
//! One POST per record, JSON body, no retries at this layer. Every failure
//! comes back as a [`SyncFailure`]; nothing here returns `Err` or panics.

use std::io;
use std::time::Duration;

use chrono_tz::Tz;

use frontdesk_core::config::{Endpoints, HTTP_TIMEOUT};
use frontdesk_core::{RecordKind, Settings, SyncableRecord};

use crate::outcome::{SyncFailure, SyncOutcome};
use crate::payload;

/// Longest response body kept in an error message, in characters.
pub const ERROR_BODY_LIMIT: usize = 200;

/// Something that can deliver a record to the remote table.
///
/// Implemented by [`WebhookClient`]; tests and the reconciler use fakes.
pub trait RecordSink {
    fn deliver(&self, record: &SyncableRecord) -> SyncOutcome;
}

impl<T: RecordSink + ?Sized> RecordSink for &T {
    fn deliver(&self, record: &SyncableRecord) -> SyncOutcome {
        (**self).deliver(record)
    }
}

/// Posts records to the configured per-kind endpoint.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    agent: ureq::Agent,
    endpoints: Endpoints,
    timezone: Tz,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(endpoints: Endpoints, timezone: Tz, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoints,
            timezone,
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.endpoints.clone(),
            settings.timezone,
            settings.http_timeout,
        )
    }

    /// Client with the default request timeout.
    pub fn with_endpoints(endpoints: Endpoints, timezone: Tz) -> Self {
        Self::new(endpoints, timezone, HTTP_TIMEOUT)
    }

    pub fn endpoint(&self, kind: RecordKind) -> Option<&str> {
        match kind {
            RecordKind::Checkin => self.endpoints.checkin.as_deref(),
            RecordKind::Mail => self.endpoints.mail.as_deref(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one record. Success means the endpoint answered exactly 200.
    pub fn sync(&self, record: &SyncableRecord) -> SyncOutcome {
        let kind = record.kind();
        let Some(url) = self.endpoint(kind) else {
            tracing::debug!("{} webhook not configured; skipping {}", kind, record.id());
            return SyncFailure::NotConfigured { kind }.into();
        };

        let body = match serde_json::to_string(&payload::build(record, self.timezone)) {
            Ok(body) => body,
            Err(e) => return SyncFailure::Unexpected(e.to_string()).into(),
        };

        let result = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(&body);

        let outcome = match result {
            Ok(response) if response.status() == 200 => SyncOutcome::Delivered,
            Ok(response) => rejected(response).into(),
            Err(ureq::Error::Status(_, response)) => rejected(response).into(),
            Err(ureq::Error::Transport(transport)) => transport_failure(&transport).into(),
        };

        match &outcome {
            SyncOutcome::Delivered => {
                tracing::info!("synced {} {} to remote table", kind.noun(), record.id())
            }
            SyncOutcome::Failed(failure) => {
                tracing::warn!("sync of {} {} failed: {}", kind.noun(), record.id(), failure)
            }
        }
        outcome
    }
}

impl RecordSink for WebhookClient {
    fn deliver(&self, record: &SyncableRecord) -> SyncOutcome {
        self.sync(record)
    }
}

fn rejected(response: ureq::Response) -> SyncFailure {
    let status = response.status();
    match response.into_string() {
        Ok(text) => SyncFailure::Rejected {
            status,
            body: truncate_chars(&text, ERROR_BODY_LIMIT).to_string(),
        },
        Err(e) => SyncFailure::Unexpected(format!(
            "status {status} with unreadable body: {e}"
        )),
    }
}

fn transport_failure(transport: &ureq::Transport) -> SyncFailure {
    if is_timeout(transport) {
        SyncFailure::Timeout
    } else {
        SyncFailure::Transport(transport.to_string())
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

/// First `limit` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
