//! Shared test harness: in-memory transport, recording callback, range server.

#![allow(dead_code)]

pub mod range_server;

use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use rxfer::callback::{TransferCallback, TransferStatus};
use rxfer::error::TransferError;
use rxfer::transport::{ChunkControl, ChunkSink, FetchStatus, Transport, UploadProgress};

/// Install the engine's tracing subscriber once per test binary, so
/// `RUST_LOG` reveals scheduler decisions when a test misbehaves.
pub fn init_logging() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = rxfer::logging::init();
    });
}

/// Everything a callback can observe, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(String, TransferStatus),
    Progress(u64, u64),
    Success(PathBuf),
    Failure(String),
    Pause(PathBuf),
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Success(_) | Event::Failure(_) | Event::Pause(_))
    }
}

/// Records every callback invocation and lets tests block until a predicate
/// over the event log holds.
#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<Event>>,
    cv: Condvar,
}

impl RecordingCallback {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
        self.cv.notify_all();
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Block until `pred` holds over the event log; panics after `timeout`.
    pub fn wait_for<F>(&self, timeout: Duration, pred: F) -> Vec<Event>
    where
        F: Fn(&[Event]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock().unwrap();
        while !pred(&events) {
            let now = Instant::now();
            if now >= deadline {
                panic!("timed out waiting for transfer events; saw {:?}", *events);
            }
            let (guard, _) = self.cv.wait_timeout(events, deadline - now).unwrap();
            events = guard;
        }
        events.clone()
    }

    /// Block until the terminal callback fires and return it.
    pub fn wait_terminal(&self, timeout: Duration) -> Event {
        let events = self.wait_for(timeout, |ev| ev.iter().any(Event::is_terminal));
        events.into_iter().find(Event::is_terminal).unwrap()
    }

    pub fn terminal_count(&self) -> usize {
        self.snapshot().iter().filter(|e| e.is_terminal()).count()
    }

    pub fn progress_values(&self) -> Vec<u64> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(current, _) => Some(current),
                _ => None,
            })
            .collect()
    }

    pub fn starts(&self) -> Vec<(String, TransferStatus)> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(name, status) => Some((name, status)),
                _ => None,
            })
            .collect()
    }
}

impl TransferCallback for RecordingCallback {
    fn on_start(&self, name: &str, status: TransferStatus) {
        self.push(Event::Start(name.to_string(), status));
    }

    fn on_progress(&self, current: u64, total: u64) {
        self.push(Event::Progress(current, total));
    }

    fn on_success(&self, file: &Path) {
        self.push(Event::Success(file.to_path_buf()));
    }

    fn on_failure(&self, error: TransferError) {
        self.push(Event::Failure(error.to_string()));
    }

    fn on_pause(&self, file: &Path) {
        self.push(Event::Pause(file.to_path_buf()));
    }
}

/// How the mock answers a size probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeBehavior {
    BodyLength,
    Unknown,
    Error,
}

/// Deterministic in-memory [`Transport`]: serves one body for any URL,
/// streams it in fixed-size chunks, and can inject failures.
pub struct MockTransport {
    body: Vec<u8>,
    chunk_size: usize,
    chunk_delay: Duration,
    fail_fetch_at: Option<u64>,
    fail_upload: bool,
    probe: ProbeBehavior,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl MockTransport {
    pub fn new(body: Vec<u8>) -> Self {
        MockTransport {
            body,
            chunk_size: 16,
            chunk_delay: Duration::ZERO,
            fail_fetch_at: None,
            fail_upload: false,
            probe: ProbeBehavior::BodyLength,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sleep between chunks, to keep transfers in flight while a test pokes
    /// at the dispatcher.
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Fetches whose requested range starts at `start` fail after feeding
    /// one chunk.
    pub fn fail_fetch_at(mut self, start: u64) -> Self {
        self.fail_fetch_at = Some(start);
        self
    }

    pub fn fail_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    /// Probe reports an unknown content length.
    pub fn probe_unknown(mut self) -> Self {
        self.probe = ProbeBehavior::Unknown;
        self
    }

    /// Probe fails outright.
    pub fn probe_error(mut self) -> Self {
        self.probe = ProbeBehavior::Error;
        self
    }

    /// Ranges requested so far, in request order.
    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn probe(&self, _url: &str) -> Result<Option<u64>, TransferError> {
        match self.probe {
            ProbeBehavior::BodyLength => Ok(Some(self.body.len() as u64)),
            ProbeBehavior::Unknown => Ok(None),
            ProbeBehavior::Error => Err(TransferError::Probe("injected probe failure".into())),
        }
    }

    fn fetch_range(
        &self,
        _url: &str,
        start: u64,
        end: u64,
        sink: &mut ChunkSink<'_>,
    ) -> Result<FetchStatus, TransferError> {
        self.requests.lock().unwrap().push((start, end));
        let body_end = (end + 1).min(self.body.len() as u64);
        let mut offset = start;
        while offset < body_end {
            if !self.chunk_delay.is_zero() {
                std::thread::sleep(self.chunk_delay);
            }
            let take = self.chunk_size.min((body_end - offset) as usize);
            let chunk = &self.body[offset as usize..offset as usize + take];
            match sink(chunk).map_err(TransferError::Storage)? {
                ChunkControl::Continue => {}
                ChunkControl::Stop => return Ok(FetchStatus::Interrupted),
            }
            offset += take as u64;
            if self.fail_fetch_at == Some(start) {
                return Err(TransferError::Network("injected segment failure".into()));
            }
        }
        Ok(FetchStatus::Completed)
    }

    fn upload(
        &self,
        _url: &str,
        file: &Path,
        progress: &mut UploadProgress<'_>,
    ) -> Result<FetchStatus, TransferError> {
        if self.fail_upload {
            return Err(TransferError::Http(500));
        }
        let total = std::fs::metadata(file)
            .map_err(TransferError::Storage)?
            .len();
        let mut sent = 0u64;
        while sent < total {
            if !self.chunk_delay.is_zero() {
                std::thread::sleep(self.chunk_delay);
            }
            let delta = (self.chunk_size as u64).min(total - sent);
            if progress(delta, total) == ChunkControl::Stop {
                return Ok(FetchStatus::Interrupted);
            }
            sent += delta;
        }
        Ok(FetchStatus::Completed)
    }
}
