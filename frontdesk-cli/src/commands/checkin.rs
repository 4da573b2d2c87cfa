//! `frontdesk checkin` and `frontdesk intake`.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use clap::Args;
use colored::Colorize;

use frontdesk_core::{types::non_blank, CheckinEvent, IntakeType, NewCheckin, Settings};
use frontdesk_sync::ChatNotifier;

use super::{load_settings, open_store, required, sync_inline};

/// Record a client arriving for an appointment.
#[derive(Args, Debug)]
pub struct CheckinArgs {
    /// Client's full name.
    #[arg(long, short = 'c')]
    pub client: String,

    /// Staff member the client is here to see.
    #[arg(long, short = 's')]
    pub staff: String,

    /// Staff directory id, if known.
    #[arg(long)]
    pub staff_id: Option<i64>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl CheckinArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let new = NewCheckin {
            client_name: self.client,
            staff_name: self.staff,
            staff_id: self.staff_id,
            client_email: self.email,
            client_phone: self.phone,
            intake_type: IntakeType::Appointment,
            due_date: None,
            notes: self.notes,
        };
        save_and_sync(&settings, new)
    }
}

/// Record a desk intake. The return is due `--days` from today unless
/// `--due` gives an explicit date.
#[derive(Args, Debug)]
pub struct IntakeArgs {
    #[arg(long, short = 'c')]
    pub client: String,

    #[arg(long, short = 's')]
    pub staff: String,

    #[arg(long)]
    pub staff_id: Option<i64>,

    /// How the documents arrived.
    #[arg(long = "type", short = 't', value_name = "TYPE", default_value_t = IntakeType::DropOff)]
    pub intake_type: IntakeType,

    /// Due date for the return (YYYY-MM-DD).
    #[arg(long, value_name = "DATE", conflicts_with = "days")]
    pub due: Option<NaiveDate>,

    /// Days from today until the return is due [default: DEFAULT_INTAKE_DAYS or 7].
    #[arg(long)]
    pub days: Option<u32>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl IntakeArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let due_date = match self.due {
            Some(date) => date,
            None => {
                let days = self.days.unwrap_or(settings.default_intake_days);
                due_in(&settings, days)?
            }
        };
        let new = NewCheckin {
            client_name: self.client,
            staff_name: self.staff,
            staff_id: self.staff_id,
            client_email: self.email,
            client_phone: self.phone,
            intake_type: self.intake_type,
            due_date: Some(due_date),
            notes: self.notes,
        };
        save_and_sync(&settings, new)
    }
}

fn due_in(settings: &Settings, days: u32) -> Result<NaiveDate> {
    let today = Utc::now().with_timezone(&settings.timezone).date_naive();
    today
        .checked_add_days(Days::new(u64::from(days)))
        .with_context(|| format!("due date {days} days from {today} is out of range"))
}

fn save_and_sync(settings: &Settings, mut new: NewCheckin) -> Result<()> {
    new.client_name = required("client name", &new.client_name)?;
    new.staff_name = required("staff name", &new.staff_name)?;
    new.client_email = non_blank(new.client_email);
    new.client_phone = non_blank(new.client_phone);
    new.notes = non_blank(new.notes);

    let store = open_store(settings)?;
    let event = store.insert_checkin(new).context("failed to save check-in")?;
    print_saved(&event);

    sync_inline(&store, settings, &event.clone().into());
    notify(settings, &event);
    Ok(())
}

fn print_saved(event: &CheckinEvent) {
    println!(
        "{} {} '{}' with {}",
        "✓".green().bold(),
        match event.intake_type {
            IntakeType::Appointment => "Checked in",
            _ => "Intake recorded for",
        },
        event.client_name,
        event.staff.name
    );
    println!("  id: {}", event.id);
    if let Some(due) = event.due_date {
        println!("  due: {}", due.format("%Y-%m-%d"));
    }
}

fn notify(settings: &Settings, event: &CheckinEvent) {
    let notifier = ChatNotifier::from_settings(settings);
    if let Err(err) = notifier.notify_checkin(event) {
        tracing::warn!(id = %event.id, error = %err, "chat notification failed");
    }
}
