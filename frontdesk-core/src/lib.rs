//! Front desk core library: domain types, record store, configuration, errors.
//!
//! - [`types`] — records, enums and the sync envelope
//! - [`store`] — SQLite [`RecordStore`] and sync status tracking
//! - [`config`] — [`Settings`] read from the environment
//! - [`error`] — [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::Settings;
pub use error::{ConfigError, StoreError};
pub use store::{PendingRow, RecordStore, StatusCounts, UndecodableRow, DEFAULT_PENDING_LIMIT};
pub use types::{
    CheckinEvent, DeliveryMethod, IntakeType, MailItemType, MailRecord, NewCheckin,
    NewMailRecord, RecordId, RecordKind, StaffRef, SyncEnvelope, SyncStatus, SyncableRecord,
};
