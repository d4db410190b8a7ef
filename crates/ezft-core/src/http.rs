//! libcurl plumbing shared by the probe, chunk fetcher and whole-file download.
//!
//! All calls block the current thread. Cancellation is polled from curl's
//! progress callback, so an in-flight transfer stops within one callback tick.

use std::cell::{Cell, RefCell};
use std::str;

use curl::easy::Easy;

use crate::config::DownloadConfig;
use crate::control::CancelToken;
use crate::retry::ChunkError;

/// Final response of a transfer (after redirects).
#[derive(Debug, Clone, Default)]
pub(crate) struct Response {
    pub status: u32,
    /// Raw header lines of the last response, status line excluded.
    pub headers: Vec<String>,
}

/// Fresh handle with the session's URL, user agent and timeouts applied.
pub(crate) fn new_easy(config: &DownloadConfig) -> Result<Easy, curl::Error> {
    let mut easy = Easy::new();
    easy.url(&config.url)?;
    easy.useragent(&config.user_agent)?;
    easy.follow_location(true)?;
    easy.connect_timeout(config.connect_timeout)?;
    // Stalled transfers: less than 1 byte/s for `stall_timeout`.
    easy.low_speed_limit(1)?;
    easy.low_speed_time(config.stall_timeout)?;
    easy.progress(true)?;
    Ok(easy)
}

/// Parse `HTTP/1.1 206 Partial Content` (or `HTTP/2 200`) into its status code.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.split_whitespace();
    parts.next()?;
    parts.next()?.parse().ok()
}

/// Run the transfer configured on `easy`, requiring status `expected`.
///
/// Body bytes are handed to `on_body` only once the status is known to be
/// `expected`; any other status aborts the transfer before the body is read
/// and is reported as `ChunkError::Http`. An `on_body` error becomes
/// `ChunkError::Storage`.
pub(crate) fn perform<F>(
    easy: &mut Easy,
    expected: u32,
    cancel: &CancelToken,
    mut on_body: F,
) -> Result<Response, ChunkError>
where
    F: FnMut(&[u8]) -> std::io::Result<()>,
{
    let status = Cell::new(0u32);
    let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
    let rejected = Cell::new(false);
    let storage_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

    let result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                let line = line.trim_end();
                if let Some(code) = parse_status_line(line) {
                    status.set(code);
                    headers.borrow_mut().clear();
                } else if !line.is_empty() {
                    headers.borrow_mut().push(line.to_string());
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            if status.get() != expected {
                rejected.set(true);
                return Ok(0);
            }
            match on_body(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    storage_error.borrow_mut().replace(e);
                    Ok(0)
                }
            }
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };

    if let Err(e) = result {
        if cancel.is_cancelled() && e.is_aborted_by_callback() {
            return Err(ChunkError::Cancelled);
        }
        if e.is_write_error() {
            if let Some(io_err) = storage_error.into_inner() {
                return Err(ChunkError::Storage(io_err));
            }
            if rejected.get() {
                return Err(ChunkError::Http(status.get()));
            }
        }
        return Err(ChunkError::Curl(e));
    }

    let code = match status.get() {
        0 => easy.response_code()?,
        code => code,
    };
    if code != expected {
        return Err(ChunkError::Http(code));
    }
    Ok(Response {
        status: code,
        headers: headers.into_inner(),
    })
}
