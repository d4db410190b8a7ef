//! Chunk type and range planning.

use serde::{Deserialize, Serialize};

/// A contiguous byte range `[start, end]` (inclusive) with its position in a partition.
///
/// `index` orders chunks for logging and the failure ledger; file placement
/// only ever uses `start`/`end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl Chunk {
    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Range in curl's format (no `bytes=` prefix).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Tiles `[range_start, range_end)` left to right with chunks of `chunk_size`.
///
/// The last chunk is clamped to `range_end - 1` and may be shorter. Indices
/// start at 0 for each plan. Returns an empty vec if `range_end <= range_start`.
pub fn plan_chunks(range_start: u64, range_end: u64, chunk_size: u64) -> Vec<Chunk> {
    if range_end <= range_start {
        return Vec::new();
    }
    let chunk_size = chunk_size.max(1);
    let count = (range_end - range_start).div_ceil(chunk_size);

    let mut out = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    let mut start = range_start;
    let mut index = 0u64;
    while start < range_end {
        let end = start.saturating_add(chunk_size - 1).min(range_end - 1);
        out.push(Chunk { index, start, end });
        index += 1;
        start = end + 1;
    }
    out
}
