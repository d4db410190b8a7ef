//! Sequential and concurrent chunk passes.
//!
//! Both return the set of chunks that must be written to the failure ledger
//! instead of touching the ledger themselves; the orchestrator decides when
//! to save or clear it.

use std::collections::{HashSet, VecDeque};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;

use super::fetch::{self, ChunkContext};
use super::ChunksFailed;
use crate::chunker::Chunk;
use crate::events::DownloadEvent;
use crate::retry::ChunkError;

/// A pass that did not complete.
#[derive(Debug)]
pub(super) struct PassFailure {
    /// Chunks to persist, ordered by index.
    pub failed: Vec<Chunk>,
    pub error: anyhow::Error,
}

/// What a sequential pass records when it stops at a failing chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Record {
    /// Only the chunk that failed. Later chunks lie past the on-disk size and
    /// are planned again on the next run.
    FailingChunk,
    /// The failing chunk and every chunk after it. Used when replaying the
    /// ledger, whose chunks are holes the size heuristic cannot see.
    FailingAndRest,
}

/// One chunk at a time, left to right; stops at the first terminal failure.
pub(super) fn run_sequential(
    ctx: &ChunkContext<'_>,
    chunks: &[Chunk],
    record: Record,
) -> Result<(), PassFailure> {
    for (pos, chunk) in chunks.iter().enumerate() {
        match fetch::download_chunk(ctx, chunk) {
            Ok(()) => ctx.events.emit(DownloadEvent::ChunkCompleted { chunk: *chunk }),
            Err(e) => {
                ctx.events.emit(DownloadEvent::ChunkFailed {
                    chunk: *chunk,
                    error: e.to_string(),
                });
                let failed = match record {
                    Record::FailingChunk => vec![*chunk],
                    Record::FailingAndRest => chunks[pos..].to_vec(),
                };
                return Err(PassFailure {
                    failed,
                    error: ChunksFailed {
                        failed: 1,
                        first_index: chunk.index,
                        source: e,
                    }
                    .into(),
                });
            }
        }
    }
    Ok(())
}

/// All chunks through a pool of `min(max_concurrency, chunks.len())` workers
/// pulling from a shared queue. Every chunk is awaited; failures of some
/// chunks do not stop the others.
pub(super) fn run_concurrent(ctx: &ChunkContext<'_>, chunks: &[Chunk]) -> Result<(), PassFailure> {
    if chunks.is_empty() {
        return Ok(());
    }
    let queue: Mutex<VecDeque<Chunk>> = Mutex::new(chunks.iter().copied().collect());
    let workers = ctx.config.max_concurrency.clamp(1, chunks.len());
    let (tx, rx) = mpsc::channel::<(Chunk, Result<(), ChunkError>)>();

    let mut reported: HashSet<u64> = HashSet::with_capacity(chunks.len());
    let mut failures: Vec<(Chunk, ChunkError)> = Vec::new();

    let panicked = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move || loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some(chunk) = next else { break };
                    let res = fetch::download_chunk(ctx, &chunk);
                    if tx.send((chunk, res)).is_err() {
                        break;
                    }
                })
            })
            .collect();
        drop(tx);

        for (chunk, res) in rx.iter() {
            reported.insert(chunk.index);
            match res {
                Ok(()) => ctx.events.emit(DownloadEvent::ChunkCompleted { chunk }),
                Err(e) => {
                    ctx.events.emit(DownloadEvent::ChunkFailed {
                        chunk,
                        error: e.to_string(),
                    });
                    failures.push((chunk, e));
                }
            }
        }

        handles
            .into_iter()
            .map(|h| h.join())
            .filter(Result::is_err)
            .count()
    });

    // Chunks a panicked worker took off the queue but never reported.
    let mut failed: Vec<Chunk> = chunks
        .iter()
        .filter(|c| !reported.contains(&c.index))
        .copied()
        .collect();
    if failures.is_empty() && failed.is_empty() {
        return Ok(());
    }
    failed.extend(failures.iter().map(|(c, _)| *c));
    failed.sort_by_key(|c| c.index);

    failures.sort_by_key(|(c, _)| c.index);
    let count = failures.len();
    let error = if failures.is_empty() {
        anyhow::anyhow!("{} chunk worker(s) panicked", panicked)
    } else {
        let pick = failures
            .iter()
            .position(|(_, e)| matches!(e, ChunkError::Cancelled))
            .unwrap_or(0);
        let (chunk, source) = failures.swap_remove(pick);
        ChunksFailed {
            failed: count,
            first_index: chunk.index,
            source,
        }
        .into()
    };
    Err(PassFailure { failed, error })
}
