//! Worker process runtime: logging setup, the blocking reconciliation loop and
//! Ctrl-C handling.

use std::fs;
use std::path::Path;

use frontdesk_core::{RecordStore, Settings};
use frontdesk_sync::WebhookClient;

use crate::error::{io_err, WorkerError};
use crate::log_rotation::RotatingLogFile;
use crate::reconcile::{CycleReport, Reconciler};
use crate::schedule::{Schedule, ThreadSleeper};

/// Fallback level variable consulted when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Start the worker and block the current thread until it exits.
pub fn start_blocking(settings: &Settings) -> Result<(), WorkerError> {
    let log_file = init_tracing(&settings.log_dir)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(settings.clone(), log_file));
    // The reconciliation loop never returns on its own.
    runtime.shutdown_background();
    result
}

/// Run the reconciliation loop on a blocking task until it fails or Ctrl-C
/// arrives. `log_file` is checked for rotation after every cycle.
pub async fn run(settings: Settings, log_file: RotatingLogFile) -> Result<(), WorkerError> {
    let store = RecordStore::open_at(&settings.database_path)?;
    tracing::info!(
        database = %settings.database_path.display(),
        checkin_sync = settings.endpoints.checkin.is_some(),
        mail_sync = settings.endpoints.mail.is_some(),
        "opened record store"
    );

    let mut reconciler = build_reconciler(store, &settings);
    let loop_handle = tokio::task::spawn_blocking(move || -> Result<(), WorkerError> {
        reconciler.run_forever_with(|_| rotate_log(&log_file))
    });

    tokio::select! {
        result = loop_handle => match result {
            Ok(inner) => inner,
            Err(err) => Err(WorkerError::Task(format!("reconciliation loop join failure: {err}"))),
        },
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                tracing::info!("received ctrl-c, shutting down worker");
                Ok(())
            }
            Err(err) => Err(WorkerError::Task(format!("ctrl-c handler failed: {err}"))),
        },
    }
}

/// Run a single reconciliation cycle against the configured store and
/// endpoints.
pub fn run_once(settings: &Settings) -> Result<CycleReport, WorkerError> {
    let store = RecordStore::open_at(&settings.database_path)?;
    let mut reconciler = build_reconciler(store, settings);
    Ok(reconciler.run_cycle())
}

fn build_reconciler(
    store: RecordStore,
    settings: &Settings,
) -> Reconciler<WebhookClient, ThreadSleeper> {
    Reconciler::new(
        store,
        WebhookClient::from_settings(settings),
        Schedule::from_settings(settings),
        ThreadSleeper,
    )
}

fn rotate_log(log_file: &RotatingLogFile) {
    match log_file.rotate_if_needed() {
        Ok(true) => tracing::info!(path = %log_file.path().display(), "rotated worker log"),
        Ok(false) => {}
        Err(err) => tracing::warn!(error = %err, "worker log rotation failed"),
    }
}

/// Log to stderr and to `worker.log` under `log_dir`, which is rotated
/// first if it is over size.
///
/// Records from crates that log through the `log` facade are forwarded.
/// Returns the file handle so the caller can rotate it between cycles.
pub fn init_tracing(log_dir: &Path) -> Result<RotatingLogFile, WorkerError> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    fs::create_dir_all(log_dir).map_err(|e| io_err(log_dir, e))?;
    let log_file = RotatingLogFile::open(crate::paths::log_path(log_dir));

    let directive = filter_directive(
        std::env::var("RUST_LOG").ok(),
        std::env::var(ENV_LOG_LEVEL).ok(),
    );
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| WorkerError::Logging(format!("invalid log filter {directive:?}: {e}")))?;

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file.clone()),
        )
        .try_init();
    Ok(log_file)
}

/// `RUST_LOG` wins, then `LOG_LEVEL`, then `info`.
fn filter_directive(rust_log: Option<String>, log_level: Option<String>) -> String {
    if let Some(directive) = rust_log.filter(|v| !v.trim().is_empty()) {
        return directive.trim().to_string();
    }
    match log_level.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => "info".to_string(),
        Some("warning") => "warn".to_string(),
        Some("critical") | Some("fatal") => "error".to_string(),
        Some(level) => level.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use frontdesk_core::config::Endpoints;
    use frontdesk_core::{NewCheckin, RecordKind, SyncStatus};
    use tempfile::TempDir;

    use super::*;

    fn settings(dir: &TempDir) -> Settings {
        let root = dir.path().to_string_lossy().into_owned();
        Settings::from_lookup(|key| match key {
            "FRONTDESK_DATABASE" => Some(format!("{root}/frontdesk.db")),
            "LOG_DIR" => Some(format!("{root}/logs")),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn filter_prefers_rust_log() {
        assert_eq!(
            filter_directive(Some("debug".into()), Some("WARNING".into())),
            "debug"
        );
        assert_eq!(filter_directive(None, Some("WARNING".into())), "warn");
        assert_eq!(filter_directive(None, Some("Debug".into())), "debug");
        assert_eq!(
            filter_directive(Some("frontdesk_worker=trace".into()), None),
            "frontdesk_worker=trace"
        );
        assert_eq!(filter_directive(Some("  ".into()), None), "info");
        assert_eq!(filter_directive(None, None), "info");
    }

    #[test]
    fn run_once_without_endpoints_marks_records_failed() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        assert_eq!(settings.endpoints, Endpoints::default());

        let store = RecordStore::open_at(&settings.database_path).unwrap();
        let id = store
            .insert_checkin(NewCheckin {
                client_name: "Ada".into(),
                staff_name: "Jane".into(),
                ..NewCheckin::default()
            })
            .unwrap()
            .id;

        let report = run_once(&settings).unwrap();
        assert_eq!(report.checkin.attempted, 1);
        assert_eq!(report.success_count(), 0);

        let record = store.get(RecordKind::Checkin, &id).unwrap();
        assert_eq!(record.envelope().status, SyncStatus::Failed);
        assert!(record
            .envelope()
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("not configured")));
    }

    #[test]
    fn init_tracing_rotates_oversized_log_at_startup() {
        use crate::log_rotation::{numbered_path, MAX_LOG_BYTES};

        let dir = TempDir::new().unwrap();
        let live = crate::paths::log_path(dir.path());
        fs::write(&live, vec![b'x'; MAX_LOG_BYTES as usize]).unwrap();

        let log_file = init_tracing(dir.path()).unwrap();

        assert_eq!(log_file.path(), live);
        assert_eq!(
            fs::metadata(numbered_path(&live, 1)).unwrap().len(),
            MAX_LOG_BYTES
        );
        assert!(fs::metadata(&live).unwrap().len() < MAX_LOG_BYTES);
        assert!(!log_file.rotate_if_needed().unwrap());
    }

    #[test]
    fn schedule_uses_configured_interval() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.retry_interval = Duration::from_secs(42);
        let store = RecordStore::open_in_memory().unwrap();
        let reconciler = build_reconciler(store, &settings);
        assert_eq!(reconciler.schedule().interval, Duration::from_secs(42));
        assert_eq!(reconciler.schedule().pacing, Duration::from_secs(1));
        assert_eq!(reconciler.schedule().batch_size, 100);
    }
}
