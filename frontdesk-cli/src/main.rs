//! Front desk: check-in and mail log with spreadsheet sync.
//!
//! # Usage
//!
//! ```text
//! frontdesk checkin --client <name> --staff <name> [--email ..] [--phone ..] [--notes ..]
//! frontdesk intake --client <name> --staff <name> [--type drop-off] [--due YYYY-MM-DD | --days N]
//! frontdesk mail --client <name> --staff <name> --item <type> --method <method> [--tracking ..]
//! frontdesk status [--kind checkin|mail] [--unsynced] [--limit N] [--json]
//! frontdesk retry <id> [--force]
//! frontdesk worker start|once|logs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use commands::{
    checkin::{CheckinArgs, IntakeArgs},
    mail::MailArgs,
    retry::RetryArgs,
    status::StatusArgs,
    worker::WorkerCommand,
};
use frontdesk_core::RecordKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "frontdesk",
    version,
    about = "Record client check-ins and outgoing mail, mirrored to a spreadsheet",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a client arriving for an appointment.
    Checkin(CheckinArgs),

    /// Record a walk-in, drop-off or remote intake with a return due date.
    Intake(IntakeArgs),

    /// Log an outgoing mail item.
    Mail(MailArgs),

    /// List recent records and their sync status.
    Status(StatusArgs),

    /// Send one record to the spreadsheet again.
    Retry(RetryArgs),

    /// Run or inspect the background reconciliation worker.
    Worker {
        #[command(subcommand)]
        command: WorkerCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared RecordKind argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `RecordKind` from CLI args.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Checkin,
    Mail,
}

impl From<KindArg> for RecordKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Checkin => RecordKind::Checkin,
            KindArg::Mail => RecordKind::Mail,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    // The worker installs its own subscriber with a log file.
    if !matches!(cli.command, Commands::Worker { .. }) {
        init_logging();
    }
    match cli.command {
        Commands::Checkin(args) => args.run(),
        Commands::Intake(args) => args.run(),
        Commands::Mail(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Retry(args) => args.run(),
        Commands::Worker { command } => commands::worker::run(command),
    }
}

/// Warnings and errors to stderr; `RUST_LOG` overrides.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
