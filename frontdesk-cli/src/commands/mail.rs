//! `frontdesk mail` — log an outgoing mail item.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use frontdesk_core::{types::non_blank, DeliveryMethod, MailItemType, NewMailRecord};

use super::{load_settings, open_store, required, sync_inline};

#[derive(Args, Debug)]
pub struct MailArgs {
    #[arg(long, short = 'c')]
    pub client: String,

    /// Staff member responsible for the item.
    #[arg(long, short = 's')]
    pub staff: String,

    #[arg(long)]
    pub staff_id: Option<i64>,

    /// What was sent (e.g. "original-return", "E-file Authorization").
    #[arg(long, short = 'i', value_name = "ITEM")]
    pub item: MailItemType,

    /// How it was sent.
    #[arg(long, short = 'm', default_value_t = DeliveryMethod::Usps)]
    pub method: DeliveryMethod,

    #[arg(long)]
    pub tracking: Option<String>,

    /// Initials of whoever sent it.
    #[arg(long)]
    pub sent_by: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl MailArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let new = NewMailRecord {
            client_name: required("client name", &self.client)?,
            staff_name: required("staff name", &self.staff)?,
            staff_id: self.staff_id,
            item_type: self.item,
            method: self.method,
            tracking_number: non_blank(self.tracking),
            sent_by: non_blank(self.sent_by),
            notes: non_blank(self.notes),
        };

        let store = open_store(&settings)?;
        let record = store.insert_mail(new).context("failed to save mail record")?;
        println!(
            "{} Logged {} for '{}' via {}",
            "✓".green().bold(),
            record.item_type,
            record.client_name,
            record.method
        );
        println!("  id: {}", record.id);
        if let Some(tracking) = &record.tracking_number {
            println!("  tracking: {tracking}");
        }

        sync_inline(&store, &settings, &record.into());
        Ok(())
    }
}
