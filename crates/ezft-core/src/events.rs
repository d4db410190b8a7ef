//! Structured download events.
//!
//! The engine never logs directly about its progress; it reports through an
//! [`EventSink`] handed to the `Downloader` at construction. [`TracingSink`]
//! forwards to `tracing`, [`RecordingSink`] keeps events in memory.

use std::sync::Mutex;
use std::time::Duration;

use crate::chunker::Chunk;

/// Transfer strategy picked after the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Range requests, replay ledger, resume from on-disk size.
    Chunked,
    /// Single streamed GET overwriting the output.
    Whole,
}

/// Whether a chunk pass runs one chunk at a time or through the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Probed {
        total_size: u64,
        supports_ranges: bool,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    AlreadyComplete {
        size: u64,
    },
    StrategySelected(Strategy),
    ReplayStarted {
        chunks: usize,
    },
    ChunksPlanned {
        offset: u64,
        chunks: usize,
        chunk_size: u64,
        mode: PassMode,
    },
    ChunkRetry {
        chunk: Chunk,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    ChunkCompleted {
        chunk: Chunk,
    },
    ChunkFailed {
        chunk: Chunk,
        error: String,
    },
    LedgerSaveFailed {
        error: String,
    },
    Finished {
        bytes: u64,
    },
}

/// Receives engine events. Called from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

/// Default sink: one `tracing` event per engine event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Probed {
                total_size,
                supports_ranges,
                etag,
                last_modified,
            } => tracing::info!(
                total_size,
                supports_ranges,
                etag = etag.as_deref().unwrap_or("-"),
                last_modified = last_modified.as_deref().unwrap_or("-"),
                "probed remote file"
            ),
            DownloadEvent::AlreadyComplete { size } => {
                tracing::info!(size, "file already downloaded completely")
            }
            DownloadEvent::StrategySelected(strategy) => {
                tracing::info!(?strategy, "selected download strategy")
            }
            DownloadEvent::ReplayStarted { chunks } => {
                tracing::info!(chunks, "retrying previously failed chunks")
            }
            DownloadEvent::ChunksPlanned {
                offset,
                chunks,
                chunk_size,
                mode,
            } => tracing::info!(offset, chunks, chunk_size, ?mode, "planned chunks"),
            DownloadEvent::ChunkRetry {
                chunk,
                attempt,
                delay,
                error,
            } => tracing::warn!(
                index = chunk.index,
                start = chunk.start,
                end = chunk.end,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "chunk failed, retrying: {}",
                error
            ),
            DownloadEvent::ChunkCompleted { chunk } => tracing::debug!(
                index = chunk.index,
                start = chunk.start,
                end = chunk.end,
                "chunk completed"
            ),
            DownloadEvent::ChunkFailed { chunk, error } => tracing::error!(
                index = chunk.index,
                start = chunk.start,
                end = chunk.end,
                "chunk failed: {}",
                error
            ),
            DownloadEvent::LedgerSaveFailed { error } => {
                tracing::error!("failed to save failed chunks record: {}", error)
            }
            DownloadEvent::Finished { bytes } => tracing::info!(bytes, "download finished"),
        }
    }
}

/// Keeps every event in order. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DownloadEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DownloadEvent> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&DownloadEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DownloadEvent) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }
}
