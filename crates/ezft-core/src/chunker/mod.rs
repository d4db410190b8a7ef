//! Chunk planning.
//!
//! Partitions a byte range into contiguous, non-overlapping chunks and derives
//! the chunk size from the remaining size when auto-chunking is enabled.

mod auto;
mod range;

pub use auto::auto_chunk_size;
pub use range::{plan_chunks, Chunk};

use crate::config::DownloadConfig;

/// Chunk size to use for `remaining` bytes under `config`.
pub fn effective_chunk_size(config: &DownloadConfig, remaining: u64) -> u64 {
    if config.auto_chunk {
        auto_chunk_size(remaining)
    } else {
        config.chunk_size.max(1)
    }
}

/// Plans chunks over `[range_start, range_end)` using the config's sizing rules.
pub fn plan(range_start: u64, range_end: u64, config: &DownloadConfig) -> Vec<Chunk> {
    let remaining = range_end.saturating_sub(range_start);
    plan_chunks(range_start, range_end, effective_chunk_size(config, remaining))
}
