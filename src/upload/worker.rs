//! Streaming upload worker: multipart POST with byte-counting progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sched::Schedulable;
use crate::transport::{ChunkControl, FetchStatus};

use super::UploadTask;

/// The single worker of an upload task. Progress deltas come from the
/// transport's body-streaming callback; the stop flag is honored between
/// callbacks, the same cooperative contract as download segments.
pub(crate) struct UploadWorker {
    task: Arc<UploadTask>,
    stopped: AtomicBool,
}

impl UploadWorker {
    pub(crate) fn new(task: Arc<UploadTask>) -> Self {
        UploadWorker {
            task,
            stopped: AtomicBool::new(false),
        }
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub(crate) fn run(&self) {
        let src = self.task.src_path();
        let result = self
            .task
            .transport()
            .upload(self.task.url(), &src, &mut |delta, total| {
                if self.stopped.load(Ordering::SeqCst) {
                    return ChunkControl::Stop;
                }
                if delta > 0 {
                    self.task.add_progress(delta, total);
                }
                ChunkControl::Continue
            });

        match result {
            Ok(FetchStatus::Completed) => self.task.finished(&src),
            Ok(FetchStatus::Interrupted) => self.task.paused(&src),
            Err(e) => self.task.failed(e),
        }
    }
}
