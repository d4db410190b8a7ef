//! Remote metadata probe: total size and range support.
//!
//! `HEAD <url>` must answer 200 with a `Content-Length`. Range support is
//! taken from `Accept-Ranges: bytes`; when that header is absent a one-byte
//! `GET` with `Range: bytes=0-0` settles it (206 means supported).

mod parse;

use anyhow::{Context, Result};

use crate::config::DownloadConfig;
use crate::control::CancelToken;
use crate::http;
use crate::retry::ChunkError;

/// What the probe learned about the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub total_size: u64,
    /// Server advertised `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// Advertised, or confirmed by the one-byte range probe.
    pub supports_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Probe the source named by `config.url`. Blocking.
pub fn probe(config: &DownloadConfig, cancel: &CancelToken) -> Result<RemoteInfo> {
    let mut easy = http::new_easy(config).context("invalid URL")?;
    easy.nobody(true)?;
    let response = http::perform(&mut easy, 200, cancel, |_| Ok(())).map_err(|e| match e {
        ChunkError::Http(code) => anyhow::anyhow!("server returned error status: {}", code),
        other => anyhow::Error::new(other).context("HEAD request failed"),
    })?;

    let headers = parse::parse_headers(&response.headers);
    let total_size = parse::parse_size(headers.content_length.as_deref())?;

    let supports_ranges = if headers.accept_ranges {
        true
    } else {
        probe_range(config, cancel)?
    };

    Ok(RemoteInfo {
        total_size,
        accept_ranges: headers.accept_ranges,
        supports_ranges,
        etag: headers.etag,
        last_modified: headers.last_modified,
    })
}

/// One-byte range request. Any status other than 206 means "no range support";
/// transport failures are errors.
fn probe_range(config: &DownloadConfig, cancel: &CancelToken) -> Result<bool> {
    let mut easy = http::new_easy(config).context("invalid URL")?;
    easy.range("0-0")?;
    match http::perform(&mut easy, 206, cancel, |_| Ok(())) {
        Ok(_) => Ok(true),
        Err(ChunkError::Http(code)) => {
            tracing::debug!(code, "range probe not answered with 206");
            Ok(false)
        }
        Err(e) => Err(anyhow::Error::new(e).context("range request failed")),
    }
}
