//! Transport seam: size probe, ranged fetch, multipart upload.
//!
//! The engine talks to the network only through [`Transport`], so schedulers
//! and tasks are testable with an in-memory implementation. The production
//! implementation is [`curl::CurlTransport`].
//!
//! Streaming is push-style: the transport feeds response chunks into a sink
//! closure, the natural shape for blocking curl handles. The sink hosts the
//! worker's cooperative stop check: returning [`ChunkControl::Stop`] aborts
//! the transfer after at most one in-flight chunk, which bounds cancellation
//! latency.

pub mod curl;

use std::io;
use std::path::Path;

use crate::error::TransferError;

/// Sink verdict after consuming a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkControl {
    /// Keep streaming.
    Continue,
    /// Abort the transfer; the transport reports [`FetchStatus::Interrupted`].
    Stop,
}

/// How a streaming transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The stream was drained to natural EOF.
    Completed,
    /// The sink requested a stop; remaining bytes were not fetched.
    Interrupted,
}

/// Chunk consumer for a ranged fetch. An `Err` is a storage failure and
/// fails the transfer with [`TransferError::Storage`].
pub type ChunkSink<'a> = dyn FnMut(&[u8]) -> io::Result<ChunkControl> + 'a;

/// Progress observer for an upload: `(bytes_just_sent, total_bytes)`.
pub type UploadProgress<'a> = dyn FnMut(u64, u64) -> ChunkControl + 'a;

/// Blocking network operations the engine needs. Implementations must be
/// shareable across worker threads.
pub trait Transport: Send + Sync {
    /// Determine the total size of the resource. `Ok(None)` means the server
    /// did not report a usable content length.
    fn probe(&self, url: &str) -> Result<Option<u64>, TransferError>;

    /// Fetch the inclusive byte range `[start, end]` (`Range: bytes=start-end`),
    /// feeding response chunks into `sink` as they arrive.
    fn fetch_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        sink: &mut ChunkSink<'_>,
    ) -> Result<FetchStatus, TransferError>;

    /// Upload `file` as a multipart POST body, reporting byte deltas to
    /// `progress` as the body streams out.
    fn upload(
        &self,
        url: &str,
        file: &Path,
        progress: &mut UploadProgress<'_>,
    ) -> Result<FetchStatus, TransferError>;
}
