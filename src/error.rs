//! Transfer error taxonomy.

use thiserror::Error;

/// Error surfaced to the caller through [`crate::callback::TransferCallback::on_failure`].
///
/// Marker-file I/O failures are deliberately absent: they are logged and
/// swallowed where they occur, because stale resume state at worst causes
/// redundant work on the next attempt, never corruption.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The size probe failed; the transfer never started.
    #[error("size probe failed: {0}")]
    Probe(String),
    /// The server answered outside 2xx.
    #[error("HTTP {0}")]
    Http(u32),
    /// Network-level failure during a transfer (connect, timeout, reset).
    #[error("network: {0}")]
    Network(String),
    /// Disk read/write failure on the destination or source file.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}
