//! One chunk: a `Range` GET streamed into its extent of the output file.

use crate::chunker::Chunk;
use crate::config::DownloadConfig;
use crate::control::CancelToken;
use crate::events::{DownloadEvent, EventSink};
use crate::http;
use crate::retry::{run_with_retry, ChunkError, RetryPolicy};
use crate::storage::StorageWriter;

/// Everything a worker needs to fetch chunks. Shared by reference across workers.
pub(super) struct ChunkContext<'a> {
    pub config: &'a DownloadConfig,
    pub storage: &'a StorageWriter,
    pub policy: &'a RetryPolicy,
    pub cancel: &'a CancelToken,
    pub events: &'a dyn EventSink,
}

/// Fetch `chunk` with retry and linear backoff. Storage errors and
/// cancellation end the loop immediately.
pub(super) fn download_chunk(ctx: &ChunkContext<'_>, chunk: &Chunk) -> Result<(), ChunkError> {
    run_with_retry(
        ctx.policy,
        ctx.cancel,
        |attempt, err: &ChunkError, delay| {
            ctx.events.emit(DownloadEvent::ChunkRetry {
                chunk: *chunk,
                attempt,
                delay,
                error: err.to_string(),
            })
        },
        || fetch_chunk_once(ctx.config, ctx.storage, chunk, ctx.cancel),
    )
}

/// Single attempt. Requires 206; writes at most `chunk.len()` bytes starting
/// at `chunk.start` and discards anything the server sends past `chunk.end`.
/// A body shorter than the chunk is a `PartialTransfer`.
pub(super) fn fetch_chunk_once(
    config: &DownloadConfig,
    storage: &StorageWriter,
    chunk: &Chunk,
    cancel: &CancelToken,
) -> Result<(), ChunkError> {
    let mut easy = http::new_easy(config)?;
    easy.range(&chunk.curl_range())?;

    let end = chunk.end + 1;
    let mut cursor = chunk.start;
    http::perform(&mut easy, 206, cancel, |data| {
        if cursor >= end {
            return Ok(());
        }
        let take = (end - cursor).min(data.len() as u64) as usize;
        storage.write_at(cursor, &data[..take])?;
        cursor += take as u64;
        Ok(())
    })?;

    let received = cursor - chunk.start;
    if received != chunk.len() {
        return Err(ChunkError::PartialTransfer {
            expected: chunk.len(),
            received,
        });
    }
    Ok(())
}
