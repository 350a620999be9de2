//! Segment type and range planning.

/// A single segment: inclusive byte range `[start, end]` within the file,
/// fetched independently. `id` names the segment's breakpoint marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Segment id, stable across resume (parsed back from marker names).
    pub id: usize,
    /// First byte offset (inclusive). Advances as bytes are written.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl Segment {
    /// Remaining bytes in this inclusive range.
    pub fn remaining(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            self.end - self.start + 1
        }
    }
}

/// Splits `[0, content_length - 1]` into `count` contiguous segments.
///
/// Even division; the final segment absorbs the integer-division remainder.
/// The count is clamped to `content_length` so every segment is non-empty.
/// Returns an empty vec if `content_length` is 0 or `count` is 0.
pub fn plan_segments(content_length: u64, count: usize) -> Vec<Segment> {
    if content_length == 0 || count == 0 {
        return Vec::new();
    }

    let count = (count as u64).min(content_length);
    let seg_size = content_length / count;

    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = i * seg_size;
        let end = if i == count - 1 {
            content_length - 1
        } else {
            start + seg_size - 1
        };
        out.push(Segment {
            id: i as usize,
            start,
            end,
        });
    }
    out
}
