// Run metrics module
//
// Counts what a command touched so it can be logged and echoed in the summary

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for a single command run.
///
/// Uses atomic operations so services can record through a shared reference.
#[derive(Debug)]
pub struct RunMetrics {
    /// Documents opened and parsed (successfully or not)
    pub files_scanned: AtomicUsize,

    /// Records that passed through a shape check or conversion
    pub records_checked: AtomicUsize,

    /// Profile-to-custom-format references resolved
    pub references_checked: AtomicUsize,

    /// Documents written to disk
    pub files_written: AtomicUsize,

    /// Documents left untouched (empty, already converted, already present)
    pub files_skipped: AtomicUsize,

    /// Diagnostics raised
    pub errors: AtomicUsize,

    /// Run start time
    start_time: Instant,
}

/// Point-in-time copy of [`RunMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub files_scanned: usize,
    pub records_checked: usize,
    pub references_checked: usize,
    pub files_written: usize,
    pub files_skipped: usize,
    pub errors: usize,
}

impl RunMetrics {
    /// Create a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            files_scanned: AtomicUsize::new(0),
            records_checked: AtomicUsize::new(0),
            references_checked: AtomicUsize::new(0),
            files_written: AtomicUsize::new(0),
            files_skipped: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_file_scanned(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_record_checked(&self) {
        self.records_checked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_references_checked(&self, count: usize) {
        self.references_checked.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_file_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_errors(&self, count: usize) {
        self.errors.fetch_add(count, Ordering::Relaxed);
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            records_checked: self.records_checked.load(Ordering::Relaxed),
            references_checked: self.references_checked.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self, command: &str) {
        let snapshot = self.snapshot();
        tracing::info!(
            command,
            files_scanned = snapshot.files_scanned,
            records_checked = snapshot.records_checked,
            references_checked = snapshot.references_checked,
            files_written = snapshot.files_written,
            files_skipped = snapshot.files_skipped,
            errors = snapshot.errors,
            "Finished in {:.2}s",
            self.elapsed().as_secs_f64()
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
