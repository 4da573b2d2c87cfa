//! `frontdesk status` — recent records and their sync state.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use frontdesk_core::{RecordKind, RecordStore, StatusCounts, SyncStatus, SyncableRecord};
use frontdesk_sync::payload::local_timestamp;

use super::{load_settings, open_store};
use crate::KindArg;

/// Longest `last_error` shown in the table; `--json` has the full text.
const ERROR_COLUMN_WIDTH: usize = 60;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show one record kind.
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    /// Only show records that are pending or failed.
    #[arg(long)]
    pub unsynced: bool,

    /// Records to show per kind, newest first.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let store = open_store(&settings)?;

        let kinds: Vec<RecordKind> = match self.kind {
            Some(kind) => vec![kind.into()],
            None => RecordKind::ALL.to_vec(),
        };
        let sections = kinds
            .into_iter()
            .map(|kind| load_section(&store, kind, self.limit, self.unsynced))
            .collect::<Result<Vec<_>>>()?;

        if self.json {
            return print_json(sections);
        }
        print_table(&sections, settings.timezone);
        Ok(())
    }
}

struct Section {
    kind: RecordKind,
    counts: StatusCounts,
    records: Vec<SyncableRecord>,
}

fn load_section(
    store: &RecordStore,
    kind: RecordKind,
    limit: usize,
    unsynced: bool,
) -> Result<Section> {
    let records = store
        .list_recent(kind, limit, unsynced)
        .with_context(|| format!("failed to list {kind} records"))?;
    let counts = store
        .status_counts(kind)
        .with_context(|| format!("failed to count {kind} records"))?;
    Ok(Section {
        kind,
        counts,
        records,
    })
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusJson {
    summary: Vec<SummaryJson>,
    records: Vec<SyncableRecord>,
}

#[derive(Serialize)]
struct SummaryJson {
    kind: RecordKind,
    pending: usize,
    success: usize,
    failed: usize,
}

fn print_json(sections: Vec<Section>) -> Result<()> {
    let mut payload = StatusJson {
        summary: Vec::new(),
        records: Vec::new(),
    };
    for section in sections {
        payload.summary.push(SummaryJson {
            kind: section.kind,
            pending: section.counts.pending,
            success: section.counts.success,
            failed: section.counts.failed,
        });
        payload.records.extend(section.records);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "client")]
    client: String,
    #[tabled(rename = "staff")]
    staff: String,
    #[tabled(rename = "type")]
    detail: String,
    #[tabled(rename = "sync")]
    status: String,
    #[tabled(rename = "last error")]
    last_error: String,
}

fn print_table(sections: &[Section], tz: chrono_tz::Tz) {
    let separator = "─".repeat(72);
    let mut unsynced = 0usize;

    for section in sections {
        let counts = section.counts;
        unsynced += counts.pending + counts.failed;

        println!(
            "{}  {} synced  {} pending  {} failed",
            heading(section.kind).bold(),
            counts.success.to_string().green().bold(),
            counts.pending.to_string().yellow().bold(),
            counts.failed.to_string().red().bold(),
        );

        if section.records.is_empty() {
            println!("  (no records)");
        } else {
            let rows: Vec<RecordRow> = section.records.iter().map(|r| row(r, tz)).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        println!("{separator}");
    }

    if unsynced > 0 {
        println!("Run 'frontdesk worker once' or 'frontdesk retry <id>' to resend unsynced records.");
    }
}

fn heading(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Checkin => "CHECK-INS",
        RecordKind::Mail => "MAIL LOG",
    }
}

fn row(record: &SyncableRecord, tz: chrono_tz::Tz) -> RecordRow {
    let detail = match record {
        SyncableRecord::Checkin(event) => match event.due_date {
            Some(due) => format!("{} (due {})", event.intake_type, due.format("%Y-%m-%d")),
            None => event.intake_type.to_string(),
        },
        SyncableRecord::Mail(mail) => format!("{} / {}", mail.item_type, mail.method),
    };
    let envelope = record.envelope();
    RecordRow {
        id: record.id().short().to_string(),
        created: local_timestamp(record.created_at(), tz),
        client: record.client_name().to_string(),
        staff: record.staff().name.clone(),
        detail,
        status: status_label(envelope.status).to_string(),
        last_error: envelope
            .last_error
            .as_deref()
            .map(|e| clip(e, ERROR_COLUMN_WIDTH))
            .unwrap_or_default(),
    }
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Pending => "PENDING",
        SyncStatus::Success => "SYNCED",
        SyncStatus::Failed => "FAILED",
    }
}

fn clip(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
