//! Timing for the reconciliation loop.

use std::time::Duration;

use frontdesk_core::{Settings, DEFAULT_PENDING_LIMIT};

/// Delay between attempts inside one cycle.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Sleep between cycles.
    pub interval: Duration,
    /// Sleep between two attempts in the same cycle.
    pub pacing: Duration,
    /// Most records fetched per kind per cycle.
    pub batch_size: usize,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: frontdesk_core::config::DEFAULT_RETRY_INTERVAL,
            pacing: DEFAULT_PACING,
            batch_size: DEFAULT_PENDING_LIMIT,
        }
    }
}

impl Schedule {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.retry_interval,
            ..Self::default()
        }
    }
}

/// Blocking pause, injectable so the loop can be driven without waiting.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
