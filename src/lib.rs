//! Resumable, concurrent, segmented file-transfer engine.
//!
//! Downloads are split into byte-range segments fetched in parallel; each
//! segment persists its remaining range to a small marker file so an
//! interrupted transfer resumes without re-fetching completed bytes. Many
//! transfers are multiplexed through one [`download::Dispatcher`] with a
//! bounded running set, a FIFO waiting queue, cooperative pause, and
//! cancellation by URL or by group tag. Uploads share the same scheduling
//! pattern with a single streaming worker per transfer.

pub mod config;
pub mod logging;

pub mod breakpoint;
pub mod callback;
pub mod download;
pub mod error;
pub mod segment;
pub mod storage;
pub mod transport;
pub mod upload;

mod sched;
