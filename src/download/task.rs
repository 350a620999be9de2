//! Per-transfer coordinator: segment planning, worker spawning, progress
//! aggregation, and the once-only terminal guard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::breakpoint::BreakpointStore;
use crate::callback::{TransferCallback, TransferStatus};
use crate::error::TransferError;
use crate::sched::Schedulable;
use crate::segment::{plan_segments, Segment};
use crate::transport::Transport;

use super::{Dispatcher, SegmentWorker};

/// One download's full lifecycle. Created on admission, mutated only by its
/// own workers through the `segment_*` callbacks, dropped once the
/// dispatcher recycles it. Never reused across transfers.
pub(crate) struct DownloadTask {
    folder: PathBuf,
    name: String,
    url: String,
    tag: Option<String>,
    content_length: u64,
    /// Segment count for a fresh split; a resume uses the marker count instead.
    thread_size: usize,
    transport: Arc<dyn Transport>,
    callback: Arc<dyn TransferCallback>,
    dispatcher: Dispatcher,
    store: BreakpointStore,
    /// Actual segment count, fixed by `init` before any worker runs.
    segment_count: AtomicUsize,
    success_count: AtomicUsize,
    /// Once-only guard: the first failure or pause wins; later ones are
    /// swallowed. Success cannot race it (see `segment_succeeded`).
    terminal: AtomicBool,
    /// Set by `signal_stop`; checked by `init` for tasks stopped while queued.
    stop_requested: AtomicBool,
    /// Aggregate progress. All segment deltas are summed under this lock and
    /// reported inside it, so the caller observes one non-decreasing sequence.
    progress: Mutex<u64>,
    workers: Mutex<Vec<Arc<SegmentWorker>>>,
}

impl DownloadTask {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        folder: PathBuf,
        name: String,
        url: String,
        tag: Option<String>,
        content_length: u64,
        thread_size: usize,
        transport: Arc<dyn Transport>,
        callback: Arc<dyn TransferCallback>,
        dispatcher: Dispatcher,
    ) -> Self {
        let store = BreakpointStore::new(&folder, &name);
        DownloadTask {
            folder,
            name,
            url,
            tag,
            content_length,
            thread_size,
            transport,
            callback,
            dispatcher,
            store,
            segment_count: AtomicUsize::new(0),
            success_count: AtomicUsize::new(0),
            terminal: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            progress: Mutex::new(0),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn store(&self) -> &BreakpointStore {
        &self.store
    }

    pub(crate) fn dest_path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    pub(crate) fn notify_start(&self, status: TransferStatus) {
        self.callback.on_start(&self.name, status);
    }

    /// Plan segments and spawn one worker per segment.
    ///
    /// Returns `false` without starting anything if a stop was requested
    /// while the task sat in the ready queue; the dispatcher then recycles
    /// it and moves on.
    pub(crate) fn init(self: &Arc<Self>) -> bool {
        if self.stop_requested.load(Ordering::SeqCst) {
            if self.try_terminal() {
                self.callback.on_pause(&self.dest_path());
            }
            return false;
        }

        let resumed = match self.store.scan() {
            Ok(points) => points,
            Err(e) => {
                // Recoverable: worst case is a full re-download.
                tracing::warn!(name = %self.name, error = %e, "breakpoint scan failed, starting fresh");
                Vec::new()
            }
        };

        let segments = if resumed.is_empty() {
            plan_segments(self.content_length, self.thread_size)
        } else {
            let remaining: u64 = resumed.iter().map(Segment::remaining).sum();
            let done = self.content_length.saturating_sub(remaining);
            *self.progress.lock().unwrap() = done;
            tracing::debug!(
                name = %self.name,
                segments = resumed.len(),
                resumed_bytes = done,
                "resuming from breakpoints"
            );
            resumed
        };

        self.segment_count.store(segments.len(), Ordering::SeqCst);
        let mut workers = self.workers.lock().unwrap();
        for segment in segments {
            let worker = Arc::new(SegmentWorker::new(Arc::clone(self), segment));
            let job = Arc::clone(&worker);
            self.dispatcher.execute(move || job.run());
            workers.push(worker);
        }
        // A stop that landed between the check above and this registration
        // found an empty worker list; re-check so it reaches the new workers.
        if self.stop_requested.load(Ordering::SeqCst) {
            for worker in workers.iter() {
                worker.stop();
            }
        }
        true
    }

    fn try_terminal(&self) -> bool {
        self.terminal
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Fold a segment's chunk into the aggregate and report it upward.
    pub(crate) fn segment_progress(&self, delta: u64) {
        let mut progress = self.progress.lock().unwrap();
        *progress += delta;
        self.callback.on_progress(*progress, self.content_length);
    }

    /// A segment drained to EOF. The worker that completes the final segment
    /// reports success; the counter makes that observation unique. Success
    /// cannot race failure or pause: a failed or paused segment never
    /// increments, so the counter cannot reach the total for such a task.
    pub(crate) fn segment_succeeded(self: &Arc<Self>, file: &Path) {
        let done = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.segment_count.load(Ordering::SeqCst) {
            self.callback.on_success(file);
            self.dispatcher.recycle(self);
        }
    }

    /// First failure wins: stop the sibling workers (they exit through the
    /// pause path, swallowed by the terminal guard) and recycle.
    pub(crate) fn segment_failed(self: &Arc<Self>, error: TransferError) {
        if self.try_terminal() {
            tracing::debug!(name = %self.name, error = %error, "transfer failed");
            self.callback.on_failure(error);
            self.signal_stop();
            self.dispatcher.recycle(self);
        }
    }

    /// First pause wins; siblings stopping afterwards are swallowed.
    pub(crate) fn segment_paused(self: &Arc<Self>, file: &Path) {
        if self.try_terminal() {
            tracing::debug!(name = %self.name, "transfer paused");
            self.callback.on_pause(file);
            self.dispatcher.recycle(self);
        }
    }
}

impl Schedulable for DownloadTask {
    fn url(&self) -> &str {
        &self.url
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn signal_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        for worker in self.workers.lock().unwrap().iter() {
            worker.stop();
        }
    }
}
