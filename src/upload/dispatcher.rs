//! Upload scheduler: admission, waiting queue, stop/cancel.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::callback::{TransferCallback, TransferStatus};
use crate::config::EngineConfig;
use crate::sched::{Admission, TaskQueues};
use crate::transport::Transport;

use super::UploadTask;

/// Scheduler for upload transfers. Same queueing contract as the download
/// [`crate::download::Dispatcher`]: bounded running set, FIFO waiting queue,
/// promotion on recycle.
#[derive(Clone)]
pub struct UploadDispatcher {
    inner: Arc<UploadDispatcherInner>,
}

struct UploadDispatcherInner {
    transport: Arc<dyn Transport>,
    queues: Mutex<TaskQueues<UploadTask>>,
}

impl UploadDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
        let config = config.normalized();
        UploadDispatcher {
            inner: Arc::new(UploadDispatcherInner {
                transport,
                queues: Mutex::new(TaskQueues::new(config.max_task_size)),
            }),
        }
    }

    /// Set the maximum number of concurrently running uploads (clamped to 1..=5).
    pub fn set_max_task_size(&self, max_task_size: usize) {
        self.queues().set_max_task_size(max_task_size);
    }

    /// Start an upload of `folder/name` to `url`. No size probe: the source
    /// is a local file, so the task is admitted immediately.
    pub fn start_upload(
        &self,
        folder: &Path,
        name: &str,
        url: &str,
        tag: Option<String>,
        callback: Arc<dyn TransferCallback>,
    ) {
        let task = Arc::new(UploadTask::new(
            folder.to_path_buf(),
            name.to_string(),
            url.to_string(),
            tag,
            Arc::clone(&self.inner.transport),
            callback,
            self.clone(),
        ));
        // Bind before matching so the queue guard is released; the Running
        // arm re-enters the lock through recycle.
        let admission = self.queues().admit(Arc::clone(&task));
        match admission {
            Admission::Running => {
                tracing::debug!(name = task.name(), "upload admitted");
                task.notify_start(TransferStatus::Uploading);
                if !task.init() {
                    self.recycle(&task);
                }
            }
            Admission::Waiting => {
                tracing::debug!(name = task.name(), "upload queued");
                task.notify_start(TransferStatus::Waiting);
            }
        }
    }

    /// Cooperatively stop the upload(s) of `url`, wherever queued.
    pub fn stop_upload(&self, url: &str) {
        self.queues().stop_matching(Some(url));
    }

    /// Cooperatively stop every upload.
    pub fn stop_all(&self) {
        self.queues().stop_matching(None);
    }

    /// Stop and discard every upload carrying `tag`.
    pub fn cancel(&self, tag: &str) {
        self.queues().cancel_matching(Some(tag));
    }

    /// Stop and discard every upload, running or waiting.
    pub fn cancel_all(&self) {
        self.queues().cancel_matching(None);
    }

    fn queues(&self) -> std::sync::MutexGuard<'_, TaskQueues<UploadTask>> {
        self.inner.queues.lock().unwrap()
    }

    pub(crate) fn recycle(&self, task: &Arc<UploadTask>) {
        let mut finished = Arc::clone(task);
        loop {
            let promoted = self.queues().recycle(&finished);
            let Some(next) = promoted else { return };
            tracing::debug!(name = next.name(), "promoting queued upload");
            next.notify_start(TransferStatus::Uploading);
            if next.init() {
                return;
            }
            finished = next;
        }
    }

    pub(crate) fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if let Err(e) = std::thread::Builder::new()
            .name("rxfer-worker".into())
            .spawn(job)
        {
            tracing::error!(error = %e, "failed to spawn worker thread");
        }
    }
}
