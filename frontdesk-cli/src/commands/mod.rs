//! Subcommand implementations and the helpers they share.

pub mod checkin;
pub mod mail;
pub mod retry;
pub mod status;
pub mod worker;

use anyhow::{ensure, Context, Result};
use colored::Colorize;

use frontdesk_core::{RecordStore, Settings, SyncableRecord};
use frontdesk_sync::{sync_record, SyncOutcome, WebhookClient};

pub(crate) fn load_settings() -> Result<Settings> {
    Settings::from_env().context("invalid configuration")
}

pub(crate) fn open_store(settings: &Settings) -> Result<RecordStore> {
    RecordStore::open_at(&settings.database_path).with_context(|| {
        format!(
            "failed to open record store at {}",
            settings.database_path.display()
        )
    })
}

/// Trimmed `value`, or an error naming `field` when it is blank.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    ensure!(!value.is_empty(), "{field} must not be empty");
    Ok(value.to_string())
}

/// Best-effort delivery right after a record is saved.
///
/// Never fails the command: the record is already stored and the worker
/// picks up anything left unsynced.
pub(crate) fn sync_inline(store: &RecordStore, settings: &Settings, record: &SyncableRecord) {
    let client = WebhookClient::from_settings(settings);
    match sync_record(store, &client, record) {
        Ok(outcome) => print_outcome(&outcome),
        Err(err) => {
            tracing::warn!(id = %record.id(), error = %err, "could not record sync outcome");
            println!("  {} sync status not saved: {err}", "!".yellow().bold());
        }
    }
}

pub(crate) fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Delivered => println!("  {} synced to spreadsheet", "✓".green().bold()),
        SyncOutcome::Failed(failure) => println!(
            "  {} not synced: {failure} (will be retried by the worker)",
            "!".yellow().bold()
        ),
    }
}
