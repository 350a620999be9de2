//! Per-upload coordinator: one worker, progress aggregation, terminal guard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::callback::{TransferCallback, TransferStatus};
use crate::error::TransferError;
use crate::sched::Schedulable;
use crate::transport::Transport;

use super::{UploadDispatcher, UploadWorker};

pub(crate) struct UploadTask {
    folder: PathBuf,
    name: String,
    url: String,
    tag: Option<String>,
    transport: Arc<dyn Transport>,
    callback: Arc<dyn TransferCallback>,
    dispatcher: UploadDispatcher,
    /// Once-only guard for failure/pause (success is unique already: there
    /// is exactly one worker).
    terminal: AtomicBool,
    stop_requested: AtomicBool,
    progress: Mutex<u64>,
    worker: Mutex<Option<Arc<UploadWorker>>>,
}

impl UploadTask {
    pub(crate) fn new(
        folder: PathBuf,
        name: String,
        url: String,
        tag: Option<String>,
        transport: Arc<dyn Transport>,
        callback: Arc<dyn TransferCallback>,
        dispatcher: UploadDispatcher,
    ) -> Self {
        UploadTask {
            folder,
            name,
            url,
            tag,
            transport,
            callback,
            dispatcher,
            terminal: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            progress: Mutex::new(0),
            worker: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn src_path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    pub(crate) fn notify_start(&self, status: TransferStatus) {
        self.callback.on_start(&self.name, status);
    }

    /// Spawn the single streaming worker. Returns `false` without starting
    /// anything if a stop arrived while the task was still queued.
    pub(crate) fn init(self: &Arc<Self>) -> bool {
        if self.stop_requested.load(Ordering::SeqCst) {
            if self.try_terminal() {
                self.callback.on_pause(&self.src_path());
            }
            return false;
        }
        let worker = Arc::new(UploadWorker::new(Arc::clone(self)));
        let job = Arc::clone(&worker);
        self.dispatcher.execute(move || job.run());
        *self.worker.lock().unwrap() = Some(Arc::clone(&worker));
        // A stop that landed between the check above and this registration
        // found no worker; re-check so it reaches the new one.
        if self.stop_requested.load(Ordering::SeqCst) {
            worker.stop();
        }
        true
    }

    fn try_terminal(&self) -> bool {
        self.terminal
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Fold streamed bytes into the aggregate and report upward, same
    /// serialization contract as download progress.
    pub(crate) fn add_progress(&self, delta: u64, total: u64) {
        let mut progress = self.progress.lock().unwrap();
        *progress += delta;
        self.callback.on_progress(*progress, total);
    }

    pub(crate) fn finished(self: &Arc<Self>, file: &Path) {
        self.callback.on_success(file);
        self.dispatcher.recycle(self);
    }

    pub(crate) fn failed(self: &Arc<Self>, error: TransferError) {
        if self.try_terminal() {
            tracing::debug!(name = %self.name, error = %error, "upload failed");
            self.callback.on_failure(error);
            self.dispatcher.recycle(self);
        }
    }

    pub(crate) fn paused(self: &Arc<Self>, file: &Path) {
        if self.try_terminal() {
            tracing::debug!(name = %self.name, "upload paused");
            self.callback.on_pause(file);
            self.dispatcher.recycle(self);
        }
    }
}

impl Schedulable for UploadTask {
    fn url(&self) -> &str {
        &self.url
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn signal_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().unwrap().as_ref() {
            worker.stop();
        }
    }
}
