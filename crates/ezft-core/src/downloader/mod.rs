//! Resumable chunked downloader.
//!
//! A download probes the source, short-circuits if the output is already
//! complete, and otherwise either runs the chunked path (replay the failure
//! ledger, then fetch `[on-disk size, total)` sequentially or through a
//! worker pool) or falls back to one streamed GET. All work blocks the
//! calling thread; run it under `spawn_blocking` from async code.

mod fetch;
mod run;
mod single;

pub use single::buffer_size;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chunker::{self, Chunk};
use crate::config::DownloadConfig;
use crate::control::CancelToken;
use crate::events::{DownloadEvent, EventSink, PassMode, Strategy, TracingSink};
use crate::ledger::FailureLedger;
use crate::probe::{self, RemoteInfo};
use crate::progress::ProgressProbe;
use crate::retry::{ChunkError, RetryPolicy};
use crate::storage::{self, StorageWriter};

use fetch::ChunkContext;
use run::{PassFailure, Record};

/// One or more chunks failed terminally in a pass. `source` is the error of
/// a representative chunk (a cancelled chunk if any, otherwise the failed
/// chunk with the lowest index).
#[derive(Debug, thiserror::Error)]
#[error("{failed} chunk(s) failed, first at chunk {first_index}")]
pub struct ChunksFailed {
    pub failed: usize,
    pub first_index: u64,
    #[source]
    pub source: ChunkError,
}

/// How a successful `download()` got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Output already had the full size and no ledger was pending.
    AlreadyComplete { size: u64 },
    /// Chunked path finished; the output holds `total_size` bytes.
    Chunked { total_size: u64 },
    /// Whole-file fallback wrote `bytes`.
    Whole { bytes: u64 },
}

pub struct Downloader {
    config: DownloadConfig,
    ledger: FailureLedger,
    policy: RetryPolicy,
    cancel: CancelToken,
    events: Arc<dyn EventSink>,
    total_size: Arc<AtomicU64>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("total_size", &self.total_size())
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Validate `config` and build a downloader with a fresh cancel token and
    /// the tracing event sink.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger: FailureLedger::new(config.failed_chunks_path.clone()),
            policy: config.retry_policy(),
            config,
            cancel: CancelToken::new(),
            events: Arc::new(TracingSink),
            total_size: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Total size learned by the last probe, if any.
    pub fn total_size(&self) -> Option<u64> {
        match self.total_size.load(Ordering::Relaxed) {
            0 => None,
            n => Some(n),
        }
    }

    /// Handle for progress polling; sees the total size once the probe has run.
    pub fn progress_probe(&self) -> ProgressProbe {
        ProgressProbe::new(self.config.output_path.clone(), Arc::clone(&self.total_size))
    }

    /// Probe the source and remember its total size.
    pub fn file_info(&self) -> Result<RemoteInfo> {
        let info = probe::probe(&self.config, &self.cancel)
            .with_context(|| format!("failed to get file info for {}", self.config.url))?;
        self.total_size.store(info.total_size, Ordering::Relaxed);
        self.events.emit(DownloadEvent::Probed {
            total_size: info.total_size,
            supports_ranges: info.supports_ranges,
            etag: info.etag.clone(),
            last_modified: info.last_modified.clone(),
        });
        Ok(info)
    }

    /// Current on-disk size of the output (0 if it does not exist).
    pub fn existing_size(&self) -> Result<u64> {
        storage::existing_size(&self.config.output_path)
    }

    /// Run one download invocation end to end.
    pub fn download(&self) -> Result<DownloadOutcome> {
        self.cancel.check()?;
        let info = self.file_info()?;
        let total = info.total_size;

        let existing = self.existing_size()?;
        if existing == total && self.config.output_path.exists() && !self.ledger.exists() {
            self.events
                .emit(DownloadEvent::AlreadyComplete { size: existing });
            return Ok(DownloadOutcome::AlreadyComplete { size: existing });
        }

        if info.supports_ranges && self.config.enable_resume {
            self.events
                .emit(DownloadEvent::StrategySelected(Strategy::Chunked));
            self.download_with_resume(total)?;
            self.events.emit(DownloadEvent::Finished { bytes: total });
            Ok(DownloadOutcome::Chunked { total_size: total })
        } else {
            self.events
                .emit(DownloadEvent::StrategySelected(Strategy::Whole));
            let bytes = self.basic_download()?;
            self.events.emit(DownloadEvent::Finished { bytes });
            Ok(DownloadOutcome::Whole { bytes })
        }
    }

    /// Chunked path for a source of `total_size` bytes: replay the ledger,
    /// then fetch whatever lies past the current on-disk size.
    pub fn download_with_resume(&self, total_size: u64) -> Result<()> {
        self.total_size.store(total_size, Ordering::Relaxed);
        let storage = StorageWriter::open_for_resume(&self.config.output_path)?;
        let ctx = self.chunk_context(&storage);

        let pending = self
            .ledger
            .load()
            .context("failed to load failed chunks record")?;
        if !pending.is_empty() {
            self.events.emit(DownloadEvent::ReplayStarted {
                chunks: pending.len(),
            });
            let replay = run::run_sequential(&ctx, &pending, Record::FailingAndRest);
            self.finish_pass(&storage, replay)?;
        }

        let current = storage.len()?;
        if current >= total_size {
            tracing::debug!(current, total_size, "nothing left past the on-disk size");
            return Ok(());
        }

        let chunks = chunker::plan(current, total_size, &self.config);
        let mode = if self.config.max_concurrency < 2 {
            PassMode::Sequential
        } else {
            PassMode::Concurrent
        };
        self.events.emit(DownloadEvent::ChunksPlanned {
            offset: current,
            chunks: chunks.len(),
            chunk_size: chunker::effective_chunk_size(&self.config, total_size - current),
            mode,
        });

        let result = match mode {
            PassMode::Sequential => run::run_sequential(&ctx, &chunks, Record::FailingChunk),
            PassMode::Concurrent => run::run_concurrent(&ctx, &chunks),
        };
        self.finish_pass(&storage, result)
    }

    /// Download only `chunks` through the worker pool, persisting failures
    /// the same way a full pass does.
    pub fn download_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let storage = StorageWriter::open_for_resume(&self.config.output_path)?;
        let ctx = self.chunk_context(&storage);
        self.finish_pass(&storage, run::run_concurrent(&ctx, chunks))
    }

    /// Whole-file fallback. Overwrites the output; clears any stale ledger on success.
    pub fn basic_download(&self) -> Result<u64> {
        let bytes = single::download_whole(&self.config, &self.policy, &self.cancel)?;
        self.ledger.clear()?;
        Ok(bytes)
    }

    fn chunk_context<'a>(&'a self, storage: &'a StorageWriter) -> ChunkContext<'a> {
        ChunkContext {
            config: &self.config,
            storage,
            policy: &self.policy,
            cancel: &self.cancel,
            events: self.events.as_ref(),
        }
    }

    /// Ledger bookkeeping after a pass: flush and clear on success, overwrite
    /// with the failed set otherwise. A failed save is reported without
    /// hiding the download error.
    fn finish_pass(
        &self,
        storage: &StorageWriter,
        result: Result<(), PassFailure>,
    ) -> Result<()> {
        match result {
            Ok(()) => {
                storage.sync()?;
                self.ledger.clear()?;
                Ok(())
            }
            Err(PassFailure { failed, error }) => {
                tracing::info!(
                    chunks = failed.len(),
                    path = %self.ledger.path().display(),
                    "saving failed chunks record"
                );
                if let Err(save_err) = self.ledger.save(&failed) {
                    self.events.emit(DownloadEvent::LedgerSaveFailed {
                        error: save_err.to_string(),
                    });
                    return Err(error.context(format!(
                        "failed to save failed chunks record: {}",
                        save_err
                    )));
                }
                Err(error)
            }
        }
    }
}
