//! Upload engine: same admission/recycle pattern as downloads, one streaming
//! multipart worker per transfer, no breakpoint persistence.

mod dispatcher;
mod task;
mod worker;

pub use dispatcher::UploadDispatcher;
pub(crate) use task::UploadTask;
pub(crate) use worker::UploadWorker;
