//! Destination file I/O: positional writes shared by segment workers.

#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Writer for the destination file. Each segment worker opens its own
/// `RangeWriter`; writes land at explicit offsets (pwrite-style) so disjoint
/// segment ranges never contend. Opening never truncates: bytes written by a
/// previous run must survive for resume.
#[derive(Clone)]
pub struct RangeWriter {
    file: Arc<File>,
}

impl RangeWriter {
    /// Open (or create) the destination file for positional writes.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::options().write(true).create(true).open(path)?;
        Ok(RangeWriter {
            file: Arc::new(file),
        })
    }

    /// Write `data` at `offset`. Does not move any shared cursor; safe for
    /// concurrent use from multiple workers writing disjoint ranges.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Non-Unix fallback: seek + write on a cloned handle.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }
}
