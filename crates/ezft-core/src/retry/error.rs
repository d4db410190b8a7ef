//! Chunk attempt error type for retry classification.

use std::fmt;

use crate::control::Cancelled;

/// Error returned by a single attempt at a chunk (or at the whole-file fallback).
/// Kept typed so the retry policy can classify it before it is turned into anyhow.
#[derive(Debug)]
pub enum ChunkError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// Response status was not the one the request requires (206 for ranges, 200 otherwise).
    Http(u32),
    /// Body ended before the expected number of bytes arrived.
    PartialTransfer { expected: u64, received: u64 },
    /// Positioned write or file open failed. Not retried.
    Storage(std::io::Error),
    /// Cancellation was requested. Not retried.
    Cancelled,
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Curl(e) => write!(f, "{}", e),
            ChunkError::Http(code) => write!(f, "unexpected HTTP status {}", code),
            ChunkError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            ChunkError::Storage(e) => write!(f, "failed to write data: {}", e),
            ChunkError::Cancelled => write!(f, "{}", Cancelled),
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChunkError::Curl(e) => Some(e),
            ChunkError::Storage(e) => Some(e),
            ChunkError::Http(_) | ChunkError::PartialTransfer { .. } | ChunkError::Cancelled => None,
        }
    }
}

impl From<Cancelled> for ChunkError {
    fn from(_: Cancelled) -> Self {
        ChunkError::Cancelled
    }
}

impl From<curl::Error> for ChunkError {
    fn from(e: curl::Error) -> Self {
        ChunkError::Curl(e)
    }
}
