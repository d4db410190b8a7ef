//! Classify HTTP status and curl errors into retry policy error kinds.

use super::error::ChunkError;
use super::policy::ErrorKind;

/// Anything the retry wrapper can classify. Implemented for `ChunkError`;
/// tests implement it for synthetic errors.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

impl Classify for ChunkError {
    fn kind(&self) -> ErrorKind {
        classify(self)
    }
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        _ => ErrorKind::Http(u16::try_from(code).unwrap_or(u16::MAX)),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Transfer
}

/// Classify a chunk error into an ErrorKind.
pub fn classify(e: &ChunkError) -> ErrorKind {
    match e {
        ChunkError::Curl(ce) => classify_curl_error(ce),
        ChunkError::Http(code) => classify_http_status(*code),
        ChunkError::PartialTransfer { .. } => ErrorKind::Transfer,
        ChunkError::Storage(_) => ErrorKind::Storage,
        ChunkError::Cancelled => ErrorKind::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn other_statuses_keep_their_code() {
        assert_eq!(classify_http_status(500), ErrorKind::Http(500));
        assert_eq!(classify_http_status(200), ErrorKind::Http(200));
        assert_eq!(classify_http_status(404), ErrorKind::Http(404));
    }

    #[test]
    fn storage_and_cancel_are_terminal_kinds() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(classify(&ChunkError::Storage(io)), ErrorKind::Storage);
        assert_eq!(classify(&ChunkError::Cancelled), ErrorKind::Cancelled);
        assert_eq!(
            classify(&ChunkError::PartialTransfer { expected: 10, received: 4 }),
            ErrorKind::Transfer
        );
    }
}
