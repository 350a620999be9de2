//! Segmented download engine: dispatcher, per-transfer task, segment workers.

mod dispatcher;
mod task;
mod worker;

pub use dispatcher::Dispatcher;
pub(crate) use task::DownloadTask;
pub(crate) use worker::SegmentWorker;
