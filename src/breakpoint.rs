//! Per-segment breakpoint markers: the durable resume state.
//!
//! Each segment owns one small text file `"." + name + "." + id` in the
//! destination folder, content `"<start>-<end>"` (ASCII, inclusive range).
//! `start` advances as bytes are written; the marker is deleted on segment
//! success and rewritten with the last-known `start` on pause or failure.
//! Markers are self-contained per segment, so losing a write to one cannot
//! corrupt another segment's resume state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::segment::Segment;

/// Marker-file store for one transfer (destination folder + file name).
#[derive(Debug, Clone)]
pub struct BreakpointStore {
    folder: PathBuf,
    name: String,
}

impl BreakpointStore {
    pub fn new(folder: &Path, name: &str) -> Self {
        BreakpointStore {
            folder: folder.to_path_buf(),
            name: name.to_string(),
        }
    }

    fn prefix(&self) -> String {
        format!(".{}.", self.name)
    }

    fn marker_path(&self, id: usize) -> PathBuf {
        self.folder.join(format!(".{}.{}", self.name, id))
    }

    /// Scan the folder for this transfer's markers and return the unfinished
    /// segments, sorted by `start` ascending.
    ///
    /// Unparsable markers are skipped. Drained markers (`start >= end`) are
    /// never replayed and are deleted so they cannot be rescanned forever.
    pub fn scan(&self) -> io::Result<Vec<Segment>> {
        let mut points = Vec::new();
        let prefix = self.prefix();
        for entry in fs::read_dir(&self.folder)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.starts_with(&prefix) {
                continue;
            }
            let Some(point) = self.parse_marker(file_name, &entry.path()) else {
                continue;
            };
            if point.start >= point.end {
                tracing::debug!(marker = file_name, "removing drained breakpoint marker");
                let _ = fs::remove_file(entry.path());
                continue;
            }
            points.push(point);
        }
        points.sort_by_key(|p| p.start);
        Ok(points)
    }

    fn parse_marker(&self, file_name: &str, path: &Path) -> Option<Segment> {
        let id: usize = file_name.rsplit('.').next()?.parse().ok()?;
        let content = fs::read_to_string(path).ok()?;
        let (start, end) = content.trim().split_once('-')?;
        Some(Segment {
            id,
            start: start.parse().ok()?,
            end: end.parse().ok()?,
        })
    }

    /// Record the remaining range for segment `id`, overwriting any previous
    /// marker.
    pub fn record(&self, id: usize, start: u64, end: u64) -> io::Result<()> {
        fs::write(self.marker_path(id), format!("{}-{}", start, end))
    }

    /// Delete segment `id`'s marker. Missing markers are not an error.
    pub fn remove(&self, id: usize) -> io::Result<()> {
        match fs::remove_file(self.marker_path(id)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
