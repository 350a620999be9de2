//! Per-segment transfer loop: ranged fetch, positional writes, cooperative
//! stop, breakpoint bookkeeping.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::TransferError;
use crate::sched::Schedulable;
use crate::segment::Segment;
use crate::storage::RangeWriter;
use crate::transport::{ChunkControl, FetchStatus};

use super::DownloadTask;

/// Worker for one segment. `start` advances past each written chunk; on any
/// exit with `start < end` the remaining range is persisted as this
/// segment's breakpoint marker.
pub(crate) struct SegmentWorker {
    task: Arc<DownloadTask>,
    id: usize,
    start: AtomicU64,
    end: u64,
    stopped: AtomicBool,
}

impl SegmentWorker {
    pub(crate) fn new(task: Arc<DownloadTask>, segment: Segment) -> Self {
        SegmentWorker {
            task,
            id: segment.id,
            start: AtomicU64::new(segment.start),
            end: segment.end,
            stopped: AtomicBool::new(false),
        }
    }

    /// Request a cooperative stop. Observed between chunks, so at most one
    /// already-fetched chunk is discarded before the worker exits.
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub(crate) fn run(&self) {
        let dest = self.task.dest_path();
        let outcome = self.transfer(&dest);

        // Persist the remaining range before reporting, so a caller reacting
        // to the terminal callback already sees durable resume state.
        let current = self.start.load(Ordering::SeqCst);
        if current < self.end {
            if let Err(e) = self.task.store().record(self.id, current, self.end) {
                tracing::warn!(segment = self.id, error = %e, "failed to record breakpoint");
            }
        }

        match outcome {
            Ok(FetchStatus::Completed) => {
                if let Err(e) = self.task.store().remove(self.id) {
                    tracing::warn!(segment = self.id, error = %e, "failed to remove breakpoint marker");
                }
                self.task.segment_succeeded(&dest);
            }
            Ok(FetchStatus::Interrupted) => self.task.segment_paused(&dest),
            Err(e) => self.task.segment_failed(e),
        }
    }

    fn transfer(&self, dest: &Path) -> Result<FetchStatus, TransferError> {
        let writer = RangeWriter::open(dest).map_err(TransferError::Storage)?;
        let first = self.start.load(Ordering::SeqCst);
        self.task
            .transport()
            .fetch_range(self.task.url(), first, self.end, &mut |chunk| {
                if self.stopped.load(Ordering::SeqCst) {
                    // The chunk already fetched is discarded, not written.
                    return Ok(ChunkControl::Stop);
                }
                let offset = self.start.load(Ordering::SeqCst);
                writer.write_at(offset, chunk)?;
                self.start.fetch_add(chunk.len() as u64, Ordering::SeqCst);
                self.task.segment_progress(chunk.len() as u64);
                Ok(ChunkControl::Continue)
            })
    }
}
