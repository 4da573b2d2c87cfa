//! Error types for frontdesk-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{RecordId, RecordKind};

/// All errors that can arise from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure (locked database, constraint, I/O).
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file could not be opened or its directory created.
    #[error("failed to open record store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No record with this id exists in the table for `kind`.
    #[error("{kind} record {id} not found")]
    RecordNotFound { kind: RecordKind, id: RecordId },

    /// The database was written by a newer schema than this build understands.
    #[error("record store schema version {found} is newer than supported {supported}")]
    SchemaTooNew { found: i64, supported: i64 },
}

/// Errors raised while reading process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: unknown time zone '{value}'")]
    InvalidTimezone { var: &'static str, value: String },

    #[error("{var}: expected a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    /// `dirs::data_dir()` returned `None` and no explicit path was configured.
    #[error("cannot determine data directory; set {var}")]
    DataDirNotFound { var: &'static str },
}
