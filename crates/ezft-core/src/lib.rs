//! ezft core: resumable, concurrent HTTP range downloads.

pub mod checksum;
pub mod chunker;
pub mod config;
pub mod control;
pub mod downloader;
pub mod events;
mod http;
pub mod ledger;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod storage;

pub use chunker::Chunk;
pub use config::DownloadConfig;
pub use control::{is_cancelled, CancelToken, Cancelled};
pub use downloader::{ChunksFailed, DownloadOutcome, Downloader};
pub use events::{DownloadEvent, EventSink, RecordingSink, TracingSink};
pub use ledger::FailureLedger;
