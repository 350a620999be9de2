//! Process-wide download scheduler: admission, waiting queue, stop/cancel.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::callback::{TransferCallback, TransferStatus};
use crate::config::EngineConfig;
use crate::sched::{Admission, TaskQueues};
use crate::transport::Transport;

use super::DownloadTask;

/// Scheduler for download transfers. Cheap to clone; all clones share the
/// same queues, limits, and transport. Construct one per process and pass it
/// around by reference or clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    transport: Arc<dyn Transport>,
    segment_threads: usize,
    queues: Mutex<TaskQueues<DownloadTask>>,
}

impl Dispatcher {
    /// Build a dispatcher with the default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: EngineConfig) -> Self {
        let config = config.normalized();
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                transport,
                segment_threads: config.segment_threads,
                queues: Mutex::new(TaskQueues::new(config.max_task_size)),
            }),
        }
    }

    /// Set the maximum number of concurrently running downloads (clamped to
    /// 1..=5). Affects only future admission decisions.
    pub fn set_max_task_size(&self, max_task_size: usize) {
        self.queues().set_max_task_size(max_task_size);
    }

    /// Start a download of `url` into `folder/name`.
    ///
    /// Probes the resource size off the caller's thread, then admits the
    /// transfer: `on_start(name, Downloading)` and workers begin if the
    /// running set has room, otherwise `on_start(name, Waiting)` and the
    /// transfer queues. A failed probe reports `on_failure`; an unknown
    /// content length drops the request (segmenting needs a known size).
    pub fn start_download(
        &self,
        folder: &Path,
        name: &str,
        url: &str,
        tag: Option<String>,
        callback: Arc<dyn TransferCallback>,
    ) {
        let this = self.clone();
        let folder = folder.to_path_buf();
        let name = name.to_string();
        let url = url.to_string();
        self.execute(move || this.probe_and_admit(folder, name, url, tag, callback));
    }

    fn probe_and_admit(
        &self,
        folder: std::path::PathBuf,
        name: String,
        url: String,
        tag: Option<String>,
        callback: Arc<dyn TransferCallback>,
    ) {
        match self.inner.transport.probe(&url) {
            Err(e) => {
                tracing::debug!(%url, error = %e, "size probe failed");
                callback.on_failure(e);
            }
            Ok(None) | Ok(Some(0)) => {
                tracing::warn!(%url, "content length unknown, dropping transfer request");
            }
            Ok(Some(content_length)) => {
                let task = Arc::new(DownloadTask::new(
                    folder,
                    name,
                    url,
                    tag,
                    content_length,
                    self.inner.segment_threads,
                    Arc::clone(&self.inner.transport),
                    callback,
                    self.clone(),
                ));
                // Bind before matching so the queue guard is released; the
                // Running arm re-enters the lock through recycle.
                let admission = self.queues().admit(Arc::clone(&task));
                match admission {
                    Admission::Running => {
                        tracing::debug!(name = task.name(), "transfer admitted");
                        task.notify_start(TransferStatus::Downloading);
                        if !task.init() {
                            self.recycle(&task);
                        }
                    }
                    Admission::Waiting => {
                        tracing::debug!(name = task.name(), "transfer queued");
                        task.notify_start(TransferStatus::Waiting);
                    }
                }
            }
        }
    }

    /// Cooperatively pause the download(s) of `url`, wherever queued.
    /// Breakpoints are persisted; a later `start_download` resumes them.
    pub fn stop_download(&self, url: &str) {
        self.queues().stop_matching(Some(url));
    }

    /// Cooperatively pause every download.
    pub fn stop_all(&self) {
        self.queues().stop_matching(None);
    }

    /// Stop and discard every download carrying `tag`; cancelled transfers
    /// are removed from their queue and never promoted.
    pub fn cancel(&self, tag: &str) {
        self.queues().cancel_matching(Some(tag));
    }

    /// Stop and discard every download, running or waiting.
    pub fn cancel_all(&self) {
        self.queues().cancel_matching(None);
    }

    fn queues(&self) -> std::sync::MutexGuard<'_, TaskQueues<DownloadTask>> {
        self.inner.queues.lock().unwrap()
    }

    /// Remove a terminated task from the running set and start the oldest
    /// waiting task in its place. Promotion happens outside the queue lock;
    /// a promoted task that was stopped while queued reports pause and the
    /// loop moves on to the next candidate.
    pub(crate) fn recycle(&self, task: &Arc<DownloadTask>) {
        let mut finished = Arc::clone(task);
        loop {
            let promoted = self.queues().recycle(&finished);
            let Some(next) = promoted else { return };
            tracing::debug!(name = next.name(), "promoting queued transfer");
            next.notify_start(TransferStatus::Downloading);
            if next.init() {
                return;
            }
            finished = next;
        }
    }

    /// Run `job` on its own worker thread.
    pub(crate) fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if let Err(e) = std::thread::Builder::new()
            .name("rxfer-worker".into())
            .spawn(job)
        {
            tracing::error!(error = %e, "failed to spawn worker thread");
        }
    }
}
