//! Logging setup for embedding applications.
//!
//! The engine emits `tracing` events everywhere; hosts that install their
//! own subscriber can skip this module entirely. [`init`] appends to a log
//! file under the XDG state directory and falls back to stderr when the
//! state directory is unusable, so transfers stay observable either way.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,rxfer=debug";

/// Location of the engine log file: `$XDG_STATE_HOME/rxfer/rxfer.log`.
pub fn log_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("rxfer")?;
    Ok(dirs.get_state_home().join("rxfer.log"))
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::options().create(true).append(true).open(path)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the engine's global `tracing` subscriber.
///
/// Events append to [`log_path`]; if the log file cannot be opened the
/// subscriber writes to stderr instead. Filtering follows `RUST_LOG`,
/// defaulting to `info,rxfer=debug`. Errors only when a global subscriber
/// is already installed.
pub fn init() -> Result<()> {
    let mut log_file = None;
    let opened = log_path()
        .ok()
        .and_then(|path| open_log(&path).ok().map(|file| (file, path)));
    let writer = match opened {
        Some((file, path)) => {
            log_file = Some(path);
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install tracing subscriber: {e}"))?;

    match log_file {
        Some(path) => tracing::info!("logging to {}", path.display()),
        None => tracing::warn!("state directory unavailable, logging to stderr"),
    }
    Ok(())
}
