use std::path::{Path, PathBuf};

pub const WORKER_LOG: &str = "worker.log";

pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(WORKER_LOG)
}
