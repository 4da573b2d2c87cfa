//! SQLite-backed record store.
//!
//! # Tables
//!
//! ```text
//! checkin_events   one row per check-in / desk intake
//! mail_log         one row per outbound mail entry
//! ```
//!
//! Both tables carry the sync envelope columns `sync_status`, `last_error`
//! and `synced_at`. Timestamps are stored as fixed-width RFC 3339 UTC text
//! (microsecond precision), so `ORDER BY created_at` is chronological.
//!
//! The request path and the reconciliation worker open the same file from
//! separate processes; WAL mode plus a busy timeout lets their single-row
//! updates interleave. Status updates are plain last-writer-wins statements.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::types::{
    CheckinEvent, DeliveryMethod, IntakeType, MailItemType, MailRecord, NewCheckin,
    NewMailRecord, RecordId, RecordKind, StaffRef, SyncEnvelope, SyncStatus, SyncableRecord,
};

/// Current schema version, tracked in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Page size the reconciliation worker asks for.
pub const DEFAULT_PENDING_LIMIT: usize = 100;

/// Stored in place of an empty failure message so `failed` rows always explain themselves.
const UNKNOWN_FAILURE: &str = "sync failed without an error message";

const CHECKIN_COLUMNS: &str = "id, client_name, staff_name, staff_id, client_email, client_phone, \
     intake_type, due_date, notes, created_at, sync_status, last_error, synced_at";

const MAIL_COLUMNS: &str = "id, client_name, staff_name, staff_id, item_type, method, \
     tracking_number, sent_by, notes, created_at, sync_status, last_error, synced_at";

fn table(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Checkin => "checkin_events",
        RecordKind::Mail => "mail_log",
    }
}

fn columns(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Checkin => CHECKIN_COLUMNS,
        RecordKind::Mail => MAIL_COLUMNS,
    }
}

// ---------------------------------------------------------------------------
// 1. Open + schema
// ---------------------------------------------------------------------------

/// Handle to the record database.
pub struct RecordStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").field("path", &self.path).finish()
    }
}

impl RecordStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// Creates the parent directory when absent and applies pending migrations.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "wal", |row| {
            row.get::<_, String>(0)
        })?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Private in-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Backing file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let current: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::SchemaTooNew {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }
        if current < 1 {
            self.conn.execute_batch(
                "BEGIN;
                 CREATE TABLE IF NOT EXISTS checkin_events (
                     id            TEXT PRIMARY KEY,
                     client_name   TEXT NOT NULL,
                     staff_name    TEXT NOT NULL,
                     staff_id      INTEGER,
                     client_email  TEXT,
                     client_phone  TEXT,
                     intake_type   TEXT NOT NULL DEFAULT 'Appointment',
                     due_date      TEXT,
                     notes         TEXT,
                     created_at    TEXT NOT NULL,
                     sync_status   TEXT NOT NULL DEFAULT 'pending'
                                   CHECK (sync_status IN ('pending', 'success', 'failed')),
                     last_error    TEXT,
                     synced_at     TEXT
                 );
                 CREATE INDEX IF NOT EXISTS checkin_events_sync
                     ON checkin_events (sync_status, created_at);
                 CREATE TABLE IF NOT EXISTS mail_log (
                     id              TEXT PRIMARY KEY,
                     client_name     TEXT NOT NULL,
                     staff_name      TEXT NOT NULL,
                     staff_id        INTEGER,
                     item_type       TEXT NOT NULL,
                     method          TEXT NOT NULL,
                     tracking_number TEXT,
                     sent_by         TEXT,
                     notes           TEXT,
                     created_at      TEXT NOT NULL,
                     sync_status     TEXT NOT NULL DEFAULT 'pending'
                                     CHECK (sync_status IN ('pending', 'success', 'failed')),
                     last_error      TEXT,
                     synced_at       TEXT
                 );
                 CREATE INDEX IF NOT EXISTS mail_log_sync
                     ON mail_log (sync_status, created_at);
                 PRAGMA user_version = 1;
                 COMMIT;",
            )?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 2. Insert
    // -----------------------------------------------------------------------

    /// Persist a new check-in stamped with the current time.
    pub fn insert_checkin(&self, new: NewCheckin) -> Result<CheckinEvent, StoreError> {
        self.insert_checkin_at(new, Utc::now())
    }

    /// Persist a new check-in with an explicit creation time.
    pub fn insert_checkin_at(
        &self,
        new: NewCheckin,
        created_at: DateTime<Utc>,
    ) -> Result<CheckinEvent, StoreError> {
        let created_at = created_at.trunc_subsecs(6);
        let event = CheckinEvent {
            id: RecordId::generate(),
            client_name: new.client_name,
            staff: StaffRef {
                id: new.staff_id,
                name: new.staff_name,
            },
            client_email: new.client_email,
            client_phone: new.client_phone,
            intake_type: new.intake_type,
            due_date: new.due_date,
            notes: new.notes,
            created_at,
            sync: SyncEnvelope::default(),
        };
        self.conn.execute(
            "INSERT INTO checkin_events
                 (id, client_name, staff_name, staff_id, client_email, client_phone,
                  intake_type, due_date, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.id.0,
                event.client_name,
                event.staff.name,
                event.staff.id,
                event.client_email,
                event.client_phone,
                event.intake_type,
                event.due_date.map(date_to_sql),
                event.notes,
                ts_to_sql(event.created_at),
            ],
        )?;
        Ok(event)
    }

    /// Persist a new mail entry stamped with the current time.
    pub fn insert_mail(&self, new: NewMailRecord) -> Result<MailRecord, StoreError> {
        self.insert_mail_at(new, Utc::now())
    }

    /// Persist a new mail entry with an explicit creation time.
    pub fn insert_mail_at(
        &self,
        new: NewMailRecord,
        created_at: DateTime<Utc>,
    ) -> Result<MailRecord, StoreError> {
        let created_at = created_at.trunc_subsecs(6);
        let record = MailRecord {
            id: RecordId::generate(),
            client_name: new.client_name,
            staff: StaffRef {
                id: new.staff_id,
                name: new.staff_name,
            },
            item_type: new.item_type,
            method: new.method,
            tracking_number: new.tracking_number,
            sent_by: new.sent_by,
            notes: new.notes,
            created_at,
            sync: SyncEnvelope::default(),
        };
        self.conn.execute(
            "INSERT INTO mail_log
                 (id, client_name, staff_name, staff_id, item_type, method,
                  tracking_number, sent_by, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id.0,
                record.client_name,
                record.staff.name,
                record.staff.id,
                record.item_type,
                record.method,
                record.tracking_number,
                record.sent_by,
                record.notes,
                ts_to_sql(record.created_at),
            ],
        )?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // 3. Read
    // -----------------------------------------------------------------------

    /// Load one record of `kind`, or `RecordNotFound`.
    pub fn get(&self, kind: RecordKind, id: &RecordId) -> Result<SyncableRecord, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", columns(kind), table(kind));
        self.conn
            .query_row(&sql, [&id.0], |row| record_from_row(kind, row))
            .optional()?
            .ok_or_else(|| StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            })
    }

    /// Look an id up in both tables.
    pub fn find(&self, id: &RecordId) -> Result<Option<SyncableRecord>, StoreError> {
        for kind in RecordKind::ALL {
            match self.get(kind, id) {
                Ok(record) => return Ok(Some(record)),
                Err(StoreError::RecordNotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Records of `kind` still needing delivery (`pending` or `failed`),
    /// oldest first, at most `limit`.
    ///
    /// Rows that no longer decode are left out; see
    /// [`fetch_pending_rows`](Self::fetch_pending_rows).
    pub fn fetch_pending(
        &self,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<SyncableRecord>, StoreError> {
        let rows = self.fetch_pending_rows(kind, limit)?;
        Ok(rows.into_iter().filter_map(Result::ok).collect())
    }

    /// Like [`fetch_pending`](Self::fetch_pending), but each row is decoded on
    /// its own: a row with an unreadable column comes back as
    /// [`UndecodableRow`] and the rest of the page is unaffected.
    pub fn fetch_pending_rows(
        &self,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<PendingRow>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {}
             WHERE sync_status IN ('pending', 'failed')
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?1",
            columns(kind),
            table(kind)
        );
        self.query_rows(kind, &sql, limit)
    }

    /// Most recent records of `kind`, newest first.
    ///
    /// With `unsynced_only`, rows already in `success` are skipped. Rows
    /// that no longer decode are skipped too.
    pub fn list_recent(
        &self,
        kind: RecordKind,
        limit: usize,
        unsynced_only: bool,
    ) -> Result<Vec<SyncableRecord>, StoreError> {
        let filter = if unsynced_only {
            "WHERE sync_status <> 'success'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {} FROM {} {filter}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
            columns(kind),
            table(kind)
        );
        let rows = self.query_rows(kind, &sql, limit)?;
        Ok(rows.into_iter().filter_map(Result::ok).collect())
    }

    /// Row counts per sync status for `kind`.
    pub fn status_counts(&self, kind: RecordKind) -> Result<StatusCounts, StoreError> {
        let sql = format!(
            "SELECT sync_status, COUNT(*) FROM {} GROUP BY sync_status",
            table(kind)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, SyncStatus>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, n) = row?;
            let n = usize::try_from(n).unwrap_or_default();
            match status {
                SyncStatus::Pending => counts.pending = n,
                SyncStatus::Success => counts.success = n,
                SyncStatus::Failed => counts.failed = n,
            }
        }
        Ok(counts)
    }

    fn query_rows(
        &self,
        kind: RecordKind,
        sql: &str,
        limit: usize,
    ) -> Result<Vec<PendingRow>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([limit], |row| match record_from_row(kind, row) {
            Ok(record) => Ok(Ok(record)),
            Err(err) => Ok(Err(UndecodableRow {
                kind,
                id: RecordId(row.get("id")?),
                reason: format!("stored {kind} record could not be read: {err}"),
            })),
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn exists(&self, kind: RecordKind, id: &RecordId) -> Result<bool, StoreError> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table(kind));
        let found = self
            .conn
            .query_row(&sql, [&id.0], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    // -----------------------------------------------------------------------
    // 4. Sync status tracking
    // -----------------------------------------------------------------------

    /// Mark a record delivered: `success`, error cleared, `synced_at` set.
    ///
    /// Repeat calls keep the first `synced_at`.
    pub fn record_success(&self, kind: RecordKind, id: &RecordId) -> Result<(), StoreError> {
        self.record_success_at(kind, id, Utc::now())
    }

    /// [`record_success`](Self::record_success) with an explicit clock reading.
    pub fn record_success_at(
        &self,
        kind: RecordKind,
        id: &RecordId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {}
             SET sync_status = 'success',
                 last_error = NULL,
                 synced_at = COALESCE(synced_at, ?1)
             WHERE id = ?2",
            table(kind)
        );
        let changed = self.conn.execute(&sql, params![ts_to_sql(now), id.0])?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            });
        }
        Ok(())
    }

    /// Mark a delivery attempt failed and remember why.
    ///
    /// Leaves `synced_at` alone. A record that already reached `success`
    /// is not modified.
    pub fn record_failure(
        &self,
        kind: RecordKind,
        id: &RecordId,
        error: &str,
    ) -> Result<(), StoreError> {
        let error = match error.trim() {
            "" => UNKNOWN_FAILURE,
            _ => error,
        };
        let sql = format!(
            "UPDATE {}
             SET sync_status = 'failed',
                 last_error = ?1
             WHERE id = ?2 AND sync_status <> 'success'",
            table(kind)
        );
        let changed = self.conn.execute(&sql, params![error, id.0])?;
        if changed == 0 && !self.exists(kind, id)? {
            return Err(StoreError::RecordNotFound {
                kind,
                id: id.clone(),
            });
        }
        Ok(())
    }
}

/// A stored row whose columns no longer decode into a record, for example
/// a label written by an older build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableRow {
    pub kind: RecordKind,
    pub id: RecordId,
    pub reason: String,
}

/// One row of an unsynced page: the record, or why it could not be read.
pub type PendingRow = Result<SyncableRecord, UndecodableRow>;

/// Per-status row counts for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.success + self.failed
    }
}

// ---------------------------------------------------------------------------
// 5. Row mapping
// ---------------------------------------------------------------------------

fn record_from_row(kind: RecordKind, row: &Row<'_>) -> rusqlite::Result<SyncableRecord> {
    let envelope = SyncEnvelope {
        status: row.get("sync_status")?,
        last_error: row.get("last_error")?,
        synced_at: timestamp_column(row, "synced_at")?,
    };
    let staff = StaffRef {
        id: row.get("staff_id")?,
        name: row.get("staff_name")?,
    };
    let created_at = timestamp_column(row, "created_at")?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "created_at".into(), Type::Null)
    })?;

    Ok(match kind {
        RecordKind::Checkin => SyncableRecord::Checkin(CheckinEvent {
            id: RecordId(row.get("id")?),
            client_name: row.get("client_name")?,
            staff,
            client_email: row.get("client_email")?,
            client_phone: row.get("client_phone")?,
            intake_type: row.get("intake_type")?,
            due_date: date_column(row, "due_date")?,
            notes: row.get("notes")?,
            created_at,
            sync: envelope,
        }),
        RecordKind::Mail => SyncableRecord::Mail(MailRecord {
            id: RecordId(row.get("id")?),
            client_name: row.get("client_name")?,
            staff,
            item_type: row.get("item_type")?,
            method: row.get("method")?,
            tracking_number: row.get("tracking_number")?,
            sent_by: row.get("sent_by")?,
            notes: row.get("notes")?,
            created_at,
            sync: envelope,
        }),
    })
}

fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_failure(row, column, e))
    })
    .transpose()
}

fn date_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_failure(row, column, e))
    })
    .transpose()
}

fn conversion_failure<E>(row: &Row<'_>, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

impl ToSql for SyncStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SyncStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        SyncStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown sync status '{s}'").into()))
    }
}

/// SQL text mapping for label-backed enums.
macro_rules! sql_label {
    ($($ty:ty),+) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.label()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse::<$ty>()
                        .map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_label!(IntakeType, MailItemType, DeliveryMethod);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone};
    use tempfile::TempDir;

    use super::*;

    fn checkin(name: &str) -> NewCheckin {
        NewCheckin {
            client_name: name.to_string(),
            staff_name: "Jane Doe".to_string(),
            staff_id: Some(2),
            ..NewCheckin::default()
        }
    }

    fn mail(name: &str) -> NewMailRecord {
        NewMailRecord {
            client_name: name.to_string(),
            staff_name: "John Smith".to_string(),
            staff_id: Some(1),
            item_type: MailItemType::AmendedReturn,
            method: DeliveryMethod::UspsCertified,
            tracking_number: Some("9400 1000 0000".to_string()),
            ..NewMailRecord::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn new_records_start_pending() {
        let store = RecordStore::open_in_memory().unwrap();
        let c = store.insert_checkin(checkin("Ada")).unwrap();
        let m = store.insert_mail(mail("Ada")).unwrap();

        for record in [
            store.get(RecordKind::Checkin, &c.id).unwrap(),
            store.get(RecordKind::Mail, &m.id).unwrap(),
        ] {
            let env = record.envelope();
            assert_eq!(env.status, SyncStatus::Pending);
            assert_eq!(env.last_error, None);
            assert_eq!(env.synced_at, None);
        }
    }

    #[test]
    fn stored_fields_survive_reload() {
        let store = RecordStore::open_in_memory().unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 3, 22).unwrap();
        let created = store
            .insert_checkin_at(
                NewCheckin {
                    client_email: Some("ada@example.com".into()),
                    intake_type: IntakeType::PortalUpload,
                    due_date: Some(due),
                    notes: Some("W-2s attached".into()),
                    ..checkin("Ada")
                },
                t0(),
            )
            .unwrap();

        let SyncableRecord::Checkin(loaded) = store.get(RecordKind::Checkin, &created.id).unwrap()
        else {
            panic!("expected check-in");
        };
        assert_eq!(loaded, created);
        assert_eq!(loaded.due_date, Some(due));
        assert_eq!(loaded.intake_type, IntakeType::PortalUpload);

        let m = store.insert_mail_at(mail("Bob"), t0()).unwrap();
        let SyncableRecord::Mail(loaded) = store.get(RecordKind::Mail, &m.id).unwrap() else {
            panic!("expected mail record");
        };
        assert_eq!(loaded, m);
    }

    #[test]
    fn success_sets_envelope_and_is_idempotent() {
        let store = RecordStore::open_in_memory().unwrap();
        let c = store.insert_checkin_at(checkin("Ada"), t0()).unwrap();
        store
            .record_failure(RecordKind::Checkin, &c.id, "remote returned status 502")
            .unwrap();

        let first = t0() + ChronoDuration::minutes(5);
        store.record_success_at(RecordKind::Checkin, &c.id, first).unwrap();
        let after_one = store.get(RecordKind::Checkin, &c.id).unwrap();
        assert_eq!(after_one.envelope().status, SyncStatus::Success);
        assert_eq!(after_one.envelope().last_error, None);
        assert_eq!(after_one.envelope().synced_at, Some(first));
        assert!(after_one.envelope().synced_at.unwrap() >= after_one.created_at());

        store
            .record_success_at(RecordKind::Checkin, &c.id, first + ChronoDuration::hours(1))
            .unwrap();
        let after_two = store.get(RecordKind::Checkin, &c.id).unwrap();
        assert_eq!(after_two, after_one);
    }

    #[test]
    fn failure_records_error_and_keeps_synced_at() {
        let store = RecordStore::open_in_memory().unwrap();
        let m = store.insert_mail(mail("Bob")).unwrap();
        store
            .record_failure(RecordKind::Mail, &m.id, "webhook request timed out")
            .unwrap();

        let record = store.get(RecordKind::Mail, &m.id).unwrap();
        assert_eq!(record.envelope().status, SyncStatus::Failed);
        assert_eq!(
            record.envelope().last_error.as_deref(),
            Some("webhook request timed out")
        );
        assert_eq!(record.envelope().synced_at, None);
    }

    #[test]
    fn empty_failure_message_is_replaced() {
        let store = RecordStore::open_in_memory().unwrap();
        let m = store.insert_mail(mail("Bob")).unwrap();
        store.record_failure(RecordKind::Mail, &m.id, "  ").unwrap();
        let record = store.get(RecordKind::Mail, &m.id).unwrap();
        assert_eq!(record.envelope().last_error.as_deref(), Some(UNKNOWN_FAILURE));
    }

    #[test]
    fn failure_after_success_does_not_corrupt_state() {
        let store = RecordStore::open_in_memory().unwrap();
        let c = store.insert_checkin(checkin("Ada")).unwrap();
        store.record_success(RecordKind::Checkin, &c.id).unwrap();
        let before = store.get(RecordKind::Checkin, &c.id).unwrap();

        store
            .record_failure(RecordKind::Checkin, &c.id, "late failure")
            .unwrap();
        let after = store.get(RecordKind::Checkin, &c.id).unwrap();
        assert_eq!(after, before);
        assert_eq!(after.envelope().status, SyncStatus::Success);
        assert_eq!(after.envelope().last_error, None);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let store = RecordStore::open_in_memory().unwrap();
        let missing = RecordId::from("does-not-exist");
        for err in [
            store.record_success(RecordKind::Checkin, &missing).unwrap_err(),
            store
                .record_failure(RecordKind::Mail, &missing, "boom")
                .unwrap_err(),
            store.get(RecordKind::Mail, &missing).unwrap_err(),
        ] {
            assert!(matches!(err, StoreError::RecordNotFound { .. }), "got: {err}");
            assert!(err.to_string().contains("does-not-exist"));
        }
        assert!(store.find(&missing).unwrap().is_none());
    }

    #[test]
    fn find_searches_both_tables() {
        let store = RecordStore::open_in_memory().unwrap();
        let c = store.insert_checkin(checkin("Ada")).unwrap();
        let m = store.insert_mail(mail("Bob")).unwrap();
        assert_eq!(store.find(&c.id).unwrap().unwrap().kind(), RecordKind::Checkin);
        assert_eq!(store.find(&m.id).unwrap().unwrap().kind(), RecordKind::Mail);
    }

    #[test]
    fn fetch_pending_is_oldest_first_and_skips_success() {
        let store = RecordStore::open_in_memory().unwrap();
        // Insert out of chronological order.
        let late = store
            .insert_checkin_at(checkin("late"), t0() + ChronoDuration::minutes(30))
            .unwrap();
        let early = store.insert_checkin_at(checkin("early"), t0()).unwrap();
        let middle = store
            .insert_checkin_at(checkin("middle"), t0() + ChronoDuration::minutes(10))
            .unwrap();
        let done = store
            .insert_checkin_at(checkin("done"), t0() - ChronoDuration::minutes(10))
            .unwrap();
        store.record_success(RecordKind::Checkin, &done.id).unwrap();
        store
            .record_failure(RecordKind::Checkin, &middle.id, "remote returned status 500")
            .unwrap();

        let pending = store
            .fetch_pending(RecordKind::Checkin, DEFAULT_PENDING_LIMIT)
            .unwrap();
        let ids: Vec<_> = pending.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);
        assert!(pending
            .iter()
            .all(|r| r.envelope().status != SyncStatus::Success));
        assert!(pending
            .windows(2)
            .all(|w| w[0].created_at() <= w[1].created_at()));
    }

    #[test]
    fn fetch_pending_respects_limit_and_kind() {
        let store = RecordStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .insert_mail_at(mail(&format!("client-{i}")), t0() + ChronoDuration::seconds(i))
                .unwrap();
        }
        store.insert_checkin(checkin("other table")).unwrap();

        let page = store.fetch_pending(RecordKind::Mail, 3).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].client_name(), "client-0");
        assert!(page.iter().all(|r| r.kind() == RecordKind::Mail));
    }

    #[test]
    fn list_recent_is_newest_first_with_optional_filter() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.insert_checkin_at(checkin("a"), t0()).unwrap();
        let b = store
            .insert_checkin_at(checkin("b"), t0() + ChronoDuration::minutes(1))
            .unwrap();
        store.record_success(RecordKind::Checkin, &b.id).unwrap();

        let all = store.list_recent(RecordKind::Checkin, 10, false).unwrap();
        assert_eq!(all[0].id(), &b.id);
        assert_eq!(all[1].id(), &a.id);

        let unsynced = store.list_recent(RecordKind::Checkin, 10, true).unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id(), &a.id);
    }

    #[test]
    fn status_counts_group_by_status() {
        let store = RecordStore::open_in_memory().unwrap();
        let ids: Vec<_> = (0..4)
            .map(|i| store.insert_mail(mail(&format!("c{i}"))).unwrap().id)
            .collect();
        store.record_success(RecordKind::Mail, &ids[0]).unwrap();
        store.record_failure(RecordKind::Mail, &ids[1], "x").unwrap();

        let counts = store.status_counts(RecordKind::Mail).unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                pending: 2,
                success: 1,
                failed: 1
            }
        );
        assert_eq!(counts.total(), 4);
        assert_eq!(store.status_counts(RecordKind::Checkin).unwrap().total(), 0);
    }

    #[test]
    fn file_store_is_shared_between_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("frontdesk.db");

        let writer = RecordStore::open_at(&path).unwrap();
        let c = writer.insert_checkin(checkin("Ada")).unwrap();

        let reader = RecordStore::open_at(&path).unwrap();
        reader.record_success(RecordKind::Checkin, &c.id).unwrap();

        let seen = writer.get(RecordKind::Checkin, &c.id).unwrap();
        assert_eq!(seen.envelope().status, SyncStatus::Success);
        assert_eq!(writer.path(), Some(path.as_path()));
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frontdesk.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 99).unwrap();
        }
        let err = RecordStore::open_at(&path).unwrap_err();
        assert!(matches!(err, StoreError::SchemaTooNew { found: 99, .. }), "got: {err}");
    }

    fn insert_raw_checkin(store: &RecordStore, id: &str, intake_type: &str, created_at: &str) {
        store
            .conn
            .execute(
                "INSERT INTO checkin_events
                     (id, client_name, staff_name, intake_type, created_at)
                 VALUES (?1, 'Legacy', 'Jane Doe', ?2, ?3)",
                params![id, intake_type, created_at],
            )
            .unwrap();
    }

    #[test]
    fn undecodable_row_does_not_hide_the_rest_of_the_page() {
        let store = RecordStore::open_in_memory().unwrap();
        insert_raw_checkin(&store, "bad-label", "Phone", "2024-03-15T13:00:00.000000Z");
        insert_raw_checkin(&store, "bad-clock", "Appointment", "yesterday");
        let good = store.insert_checkin_at(checkin("Ada"), t0()).unwrap();

        let rows = store.fetch_pending_rows(RecordKind::Checkin, 10).unwrap();
        assert_eq!(rows.len(), 3);
        let bad: Vec<&UndecodableRow> = rows.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(bad.len(), 2);
        let label = bad.iter().find(|b| b.id.0 == "bad-label").unwrap();
        assert_eq!(label.kind, RecordKind::Checkin);
        assert!(label.reason.contains("unknown intake type 'Phone'"), "{}", label.reason);
        assert!(bad.iter().any(|b| b.id.0 == "bad-clock"));

        let pending = store.fetch_pending(RecordKind::Checkin, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), &good.id);
        assert_eq!(store.list_recent(RecordKind::Checkin, 10, false).unwrap().len(), 1);

        store
            .record_failure(RecordKind::Checkin, &label.id, &label.reason)
            .unwrap();
        assert_eq!(store.status_counts(RecordKind::Checkin).unwrap().failed, 1);
    }
}
