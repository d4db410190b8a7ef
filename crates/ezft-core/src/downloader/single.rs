//! Whole-file fallback: one streamed GET, no ranges, output overwritten.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::DownloadConfig;
use crate::control::CancelToken;
use crate::http;
use crate::retry::{run_with_retry, ChunkError, RetryPolicy};

const MIN_BUFFER: u64 = 64 * 1024;
const MAX_BUFFER: u64 = 2 * 1024 * 1024;

/// Write buffer for the streamed body: the chunk size clamped to [64 KiB, 2 MiB].
pub fn buffer_size(chunk_size: u64) -> usize {
    chunk_size.clamp(MIN_BUFFER, MAX_BUFFER) as usize
}

/// Download the whole resource, retrying the entire transfer on failure.
/// Returns the number of bytes written.
pub(super) fn download_whole(
    config: &DownloadConfig,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<u64> {
    run_with_retry(
        policy,
        cancel,
        |attempt, err: &ChunkError, delay| {
            tracing::warn!(
                attempt,
                max_attempts = policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                "download attempt failed: {}",
                err
            )
        },
        || fetch_whole_once(config, cancel),
    )
    .map_err(anyhow::Error::new)
    .with_context(|| format!("download of {} failed", config.url))
}

fn create_output(path: &Path, capacity: usize) -> std::io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    Ok(BufWriter::with_capacity(capacity, file))
}

/// One attempt. The output is only created (truncated) once a 200 response
/// starts delivering its body, so a failed request leaves an existing file alone.
fn fetch_whole_once(config: &DownloadConfig, cancel: &CancelToken) -> Result<u64, ChunkError> {
    let mut easy = http::new_easy(config)?;
    let capacity = buffer_size(config.chunk_size);
    let mut writer: Option<BufWriter<File>> = None;
    let mut written = 0u64;

    http::perform(&mut easy, 200, cancel, |data| {
        if writer.is_none() {
            writer = Some(create_output(&config.output_path, capacity)?);
        }
        if let Some(w) = writer.as_mut() {
            w.write_all(data)?;
        }
        written += data.len() as u64;
        Ok(())
    })?;

    let mut writer = match writer {
        Some(w) => w,
        None => create_output(&config.output_path, capacity).map_err(ChunkError::Storage)?,
    };
    writer.flush().map_err(ChunkError::Storage)?;
    tracing::info!(bytes = written, "download completed: {} bytes written", written);
    Ok(written)
}
