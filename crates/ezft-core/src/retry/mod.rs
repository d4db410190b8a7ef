//! Retry and backoff policy.
//!
//! Classifies chunk failures (timeouts, throttling, connection failures,
//! storage errors, cancellation) and applies a linear backoff policy through a
//! generic retry wrapper that knows nothing about the I/O it is retrying.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status, Classify};
pub use error::ChunkError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
