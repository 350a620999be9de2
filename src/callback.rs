//! Caller-facing callback contract.
//!
//! One callback instance is supplied per transfer request. Exactly one of
//! `on_success`, `on_failure`, or `on_pause` fires per transfer, even under
//! concurrent segment completions. Methods default to no-ops so callers
//! implement only what they consume.

use std::path::Path;

use crate::error::TransferError;

/// Status reported by `on_start` when a transfer is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Admitted into the running set; workers are starting.
    Downloading,
    /// Admitted into the running set; the upload body is streaming.
    Uploading,
    /// Running set is full; queued until a running transfer finishes.
    Waiting,
}

/// Per-transfer observer. Invoked from worker threads, never the caller's.
pub trait TransferCallback: Send + Sync {
    /// The transfer was admitted (running) or queued (waiting).
    fn on_start(&self, name: &str, status: TransferStatus) {
        let _ = (name, status);
    }

    /// Aggregate progress for the whole transfer: bytes done of `total`.
    /// The sequence of `current` values is non-decreasing.
    fn on_progress(&self, current: u64, total: u64) {
        let _ = (current, total);
    }

    /// All segments finished; `file` is the completed destination.
    fn on_success(&self, file: &Path) {
        let _ = file;
    }

    /// The transfer terminated on the first segment failure.
    fn on_failure(&self, error: TransferError) {
        let _ = error;
    }

    /// The transfer was stopped by the caller; breakpoints are on disk.
    fn on_pause(&self, file: &Path) {
        let _ = file;
    }
}
