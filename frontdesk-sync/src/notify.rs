//! Chat notifications for new check-ins.

use std::time::Duration;

use frontdesk_core::config::ChatSettings;
use frontdesk_core::{CheckinEvent, Settings};

use crate::SyncError;

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts `{"text": ...}` messages to an incoming chat webhook.
#[derive(Debug, Clone)]
pub struct ChatNotifier {
    agent: ureq::Agent,
    settings: ChatSettings,
}

impl ChatNotifier {
    pub fn new(settings: ChatSettings) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(NOTIFY_TIMEOUT).build();
        Self { agent, settings }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.chat.clone())
    }

    /// Whether `event` should be announced: a webhook is configured and the
    /// assigned staff member matches the notify target, if one is set.
    pub fn should_notify(&self, event: &CheckinEvent) -> bool {
        if self.settings.webhook.is_none() {
            return false;
        }
        match &self.settings.notify_staff {
            Some(target) => event.staff.name.trim().eq_ignore_ascii_case(target.trim()),
            None => true,
        }
    }

    /// Post a message for `event`. `Ok(false)` when nothing was sent.
    pub fn notify_checkin(&self, event: &CheckinEvent) -> Result<bool, SyncError> {
        let Some(url) = self.settings.webhook.as_deref() else {
            return Ok(false);
        };
        if !self.should_notify(event) {
            tracing::debug!(
                "check-in {} is for {}; no chat notification",
                event.id,
                event.staff.name
            );
            return Ok(false);
        }

        let body = serde_json::json!({ "text": checkin_message(event) });
        match self.agent.post(url).send_json(body) {
            Ok(_) => {
                tracing::debug!("chat notification sent for check-in {}", event.id);
                Ok(true)
            }
            Err(e) => Err(SyncError::Notify(Box::new(e))),
        }
    }
}

/// Message text for a check-in. Optional lines are omitted when empty.
pub fn checkin_message(event: &CheckinEvent) -> String {
    let mut lines = vec![format!(
        ":wave: *{}* just checked in ({})",
        event.client_name,
        event.intake_type.label()
    )];
    if let Some(email) = &event.client_email {
        lines.push(format!("Email: {email}"));
    }
    if let Some(phone) = &event.client_phone {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(notes) = &event.notes {
        lines.push(format!("Notes: {notes}"));
    }
    lines.join("\n")
}
