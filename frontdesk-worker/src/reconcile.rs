//! Reconciliation loop: re-deliver every record that has not reached `success`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use frontdesk_core::{RecordKind, RecordStore, SyncableRecord, UndecodableRow};
use frontdesk_sync::{attempt, tracker, RecordSink, SyncFailure, SyncOutcome};

use crate::schedule::{Schedule, Sleeper};

/// Attempt counts for one record kind in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl KindTally {
    fn record(&mut self, delivered: bool) {
        self.attempted += 1;
        if delivered {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Summary of one pass over both tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub checkin: KindTally,
    pub mail: KindTally,
    /// Kinds whose pending batch could not be read.
    pub fetch_errors: usize,
}

impl CycleReport {
    pub fn tally(&self, kind: RecordKind) -> &KindTally {
        match kind {
            RecordKind::Checkin => &self.checkin,
            RecordKind::Mail => &self.mail,
        }
    }

    fn tally_mut(&mut self, kind: RecordKind) -> &mut KindTally {
        match kind {
            RecordKind::Checkin => &mut self.checkin,
            RecordKind::Mail => &mut self.mail,
        }
    }

    pub fn attempted(&self) -> usize {
        self.checkin.attempted + self.mail.attempted
    }

    pub fn success_count(&self) -> usize {
        self.checkin.succeeded + self.mail.succeeded
    }

    pub fn failure_count(&self) -> usize {
        self.checkin.failed + self.mail.failed
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "check-ins {}/{} synced, mail {}/{} synced",
            self.checkin.succeeded, self.checkin.attempted, self.mail.succeeded, self.mail.attempted
        )
    }
}

/// Drives delivery of pending and failed records through a [`RecordSink`].
pub struct Reconciler<S, P> {
    store: RecordStore,
    sink: S,
    schedule: Schedule,
    sleeper: P,
}

impl<S: RecordSink, P: Sleeper> Reconciler<S, P> {
    pub fn new(store: RecordStore, sink: S, schedule: Schedule, sleeper: P) -> Self {
        Self {
            store,
            sink,
            schedule,
            sleeper,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn sleeper(&self) -> &P {
        &self.sleeper
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// One pass: for each kind, fetch the oldest unsynced batch and attempt
    /// every record in it, pausing `pacing` between attempts.
    ///
    /// Never fails: a store error skips that kind, while a failing or
    /// panicking delivery is recorded as `failed` and the pass moves on. A
    /// row that no longer decodes is marked `failed` with the decode error
    /// and is not sent.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut attempts = 0usize;

        for kind in RecordKind::ALL {
            let batch = match self.store.fetch_pending_rows(kind, self.schedule.batch_size) {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(%kind, error = %err, "could not load unsynced records");
                    report.fetch_errors += 1;
                    continue;
                }
            };
            if !batch.is_empty() {
                tracing::debug!(%kind, count = batch.len(), "retrying unsynced records");
            }

            for row in batch {
                let record = match row {
                    Ok(record) => record,
                    Err(bad) => {
                        self.quarantine(&bad);
                        report.tally_mut(kind).record(false);
                        continue;
                    }
                };
                if attempts > 0 {
                    self.sleeper.sleep(self.schedule.pacing);
                }
                attempts += 1;
                let delivered = self.attempt(&record);
                report.tally_mut(kind).record(delivered);
            }
        }

        report
    }

    /// Run `cycles` passes, sleeping `interval` between them.
    pub fn run_cycles(&mut self, cycles: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(cycles);
        for n in 0..cycles {
            if n > 0 {
                self.sleeper.sleep(self.schedule.interval);
            }
            let report = self.run_cycle();
            log_report(&report);
            reports.push(report);
        }
        reports
    }

    /// Run forever. Only process termination stops the loop.
    pub fn run_forever(&mut self) -> ! {
        self.run_forever_with(|_| {})
    }

    /// [`run_forever`](Self::run_forever), calling `between_cycles` after
    /// each pass and before the interval sleep.
    pub fn run_forever_with<F>(&mut self, mut between_cycles: F) -> !
    where
        F: FnMut(&CycleReport),
    {
        tracing::info!(
            interval_secs = self.schedule.interval.as_secs(),
            batch_size = self.schedule.batch_size,
            "reconciliation worker started"
        );
        loop {
            let report = self.run_cycle();
            log_report(&report);
            between_cycles(&report);
            self.sleeper.sleep(self.schedule.interval);
        }
    }

    fn quarantine(&self, bad: &UndecodableRow) {
        tracing::error!(kind = %bad.kind, id = %bad.id, error = %bad.reason, "skipping unreadable record");
        if let Err(err) = self.store.record_failure(bad.kind, &bad.id, &bad.reason) {
            tracing::error!(id = %bad.id, error = %err, "could not record sync outcome");
        }
    }

    fn attempt(&self, record: &SyncableRecord) -> bool {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            attempt::sync_record(&self.store, &self.sink, record)
        }));

        match result {
            Ok(Ok(outcome)) => outcome.is_delivered(),
            Ok(Err(err)) => {
                tracing::error!(id = %record.id(), error = %err, "could not record sync outcome");
                false
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(id = %record.id(), panic = %message, "sync attempt panicked");
                let outcome = SyncOutcome::Failed(SyncFailure::Unexpected(message));
                if let Err(err) = tracker::record_outcome(&self.store, record, &outcome) {
                    tracing::error!(id = %record.id(), error = %err, "could not record sync outcome");
                }
                false
            }
        }
    }
}

fn log_report(report: &CycleReport) {
    if report.attempted() == 0 && report.fetch_errors == 0 {
        tracing::debug!("nothing to reconcile");
    } else {
        tracing::info!(
            attempted = report.attempted(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "reconciliation cycle finished: {report}"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
