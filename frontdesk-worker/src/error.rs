use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the reconciliation worker runtime.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] frontdesk_core::StoreError),

    #[error("worker task failed: {0}")]
    Task(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkerError {
    WorkerError::Io {
        path: path.into(),
        source,
    }
}
