//! `frontdesk retry <id>` — resend one record now.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use frontdesk_core::RecordId;
use frontdesk_sync::{retry, RetryResult, SyncError, SyncOutcome, WebhookClient};

use super::{load_settings, open_store, print_outcome};

#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Record id as shown by `frontdesk status --json`.
    pub id: String,

    /// Send even if the record is already synced.
    #[arg(long)]
    pub force: bool,
}

impl RetryArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let store = open_store(&settings)?;
        let client = WebhookClient::from_settings(&settings);
        let id = RecordId::from(self.id.trim());

        let result = match retry(&store, &client, &id, self.force) {
            Ok(result) => result,
            Err(SyncError::UnknownRecord(id)) => {
                bail!("no check-in or mail record with id {id}")
            }
            Err(err) => return Err(err).context("retry failed"),
        };

        match result {
            RetryResult::AlreadySynced(record) => {
                let synced_at = record
                    .envelope()
                    .synced_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "an unknown time".to_string());
                println!(
                    "{} {} {} already synced at {synced_at}; use --force to send it again",
                    "·".bright_black(),
                    record.kind().noun(),
                    record.id()
                );
            }
            RetryResult::Attempted { record, outcome } => {
                println!("Retried {} {}", record.kind().noun(), record.id());
                print_outcome(&outcome);
                if let SyncOutcome::Failed(failure) = outcome {
                    bail!("sync failed: {failure}");
                }
            }
        }
        Ok(())
    }
}
