//! Size-based rotation for the worker log file.
//!
//! The live file is checked when the worker starts and again after every
//! reconciliation cycle. Once it reaches 5 MiB it is shifted down the backup
//! chain, keeping three copies:
//!   worker.log → worker.log.1 → worker.log.2 → worker.log.3

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

/// Size at which the live log is rotated (5 MiB).
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Rotated copies kept alongside the live log.
pub const MAX_ROTATED_FILES: usize = 3;

/// Path of the `n`-th rotated copy of `base` (e.g. `worker.log.2`).
pub fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(crate::paths::WORKER_LOG);
    base.with_file_name(format!("{name}.{n}"))
}

/// Move `live` to `.1`, pushing older copies down and dropping anything
/// past `.keep`. Missing links in the chain are skipped.
fn shift_backups(live: &Path, keep: usize) -> io::Result<()> {
    if keep == 0 {
        return ignore_missing(fs::remove_file(live));
    }
    ignore_missing(fs::remove_file(numbered_path(live, keep)))?;
    for n in (0..keep).rev() {
        let from = match n {
            0 => live.to_path_buf(),
            n => numbered_path(live, n),
        };
        ignore_missing(fs::rename(from, numbered_path(live, n + 1)))?;
    }
    Ok(())
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[derive(Debug)]
struct LogState {
    path: PathBuf,
    max_bytes: u64,
    keep: usize,
    file: Option<File>,
}

impl LogState {
    fn over_limit(&self) -> io::Result<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() >= self.max_bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn reopen(&mut self) {
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .ok();
    }

    fn rotate_if_needed(&mut self) -> io::Result<bool> {
        if !self.over_limit()? {
            return Ok(false);
        }
        self.file = None;
        let shifted = shift_backups(&self.path, self.keep);
        self.reopen();
        shifted.map(|()| true)
    }
}

/// Append handle on the worker log, shared between the `tracing` writer
/// and the loop that rotates it.
///
/// If the file cannot be opened, events are dropped rather than failing
/// the worker.
#[derive(Debug, Clone)]
pub struct RotatingLogFile {
    state: Arc<Mutex<LogState>>,
}

impl RotatingLogFile {
    /// Open `path` with the default limits, rotating first if it is already
    /// over size.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, MAX_LOG_BYTES, MAX_ROTATED_FILES)
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_bytes: u64, keep: usize) -> Self {
        let mut state = LogState {
            path: path.into(),
            max_bytes,
            keep,
            file: None,
        };
        if state.rotate_if_needed().is_err() || state.file.is_none() {
            state.reopen();
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Whether events currently reach the file.
    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    /// Rotate if the live file has reached the size limit. Returns `true`
    /// if it did.
    pub fn rotate_if_needed(&self) -> io::Result<bool> {
        self.lock().rotate_if_needed()
    }
}

/// Writer handed out per event; holds the lock for the duration of one
/// formatted line.
pub struct LogWriter<'a>(MutexGuard<'a, LogState>);

impl Write for LogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.file.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingLogFile {
    type Writer = LogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.lock())
    }
}
