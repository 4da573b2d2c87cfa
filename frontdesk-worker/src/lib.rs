//! Reconciliation worker: a long-running loop that re-delivers every check-in
//! and mail record still `pending` or `failed`.

mod error;
pub mod log_rotation;
pub mod paths;
pub mod reconcile;
mod runtime;
pub mod schedule;

pub use error::WorkerError;
pub use reconcile::{CycleReport, KindTally, Reconciler};
pub use runtime::{init_tracing, run, run_once, start_blocking};
pub use schedule::{Schedule, Sleeper, ThreadSleeper};
