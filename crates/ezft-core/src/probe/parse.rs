//! Header lines from the metadata probe.

/// Headers the probe cares about, as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProbeHeaders {
    /// Raw `Content-Length` value; parsed by the caller so the error can quote it.
    pub content_length: Option<String>,
    /// `Accept-Ranges: bytes` (case-insensitive).
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

pub(crate) fn parse_headers(lines: &[String]) -> ProbeHeaders {
    let mut out = ProbeHeaders::default();
    for line in lines {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.trim_matches('"').to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            out.last_modified = Some(value.to_string());
        }
    }
    out
}

/// Parse a `Content-Length` value into the total size.
pub(crate) fn parse_size(raw: Option<&str>) -> anyhow::Result<u64> {
    let raw = raw.unwrap_or("");
    raw.trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("unable to parse file size: {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn size_and_ranges() {
        let h = parse_headers(&lines(&["Content-Length: 25", "Accept-Ranges: bytes"]));
        assert_eq!(h.content_length.as_deref(), Some("25"));
        assert!(h.accept_ranges);
        assert_eq!(parse_size(h.content_length.as_deref()).unwrap(), 25);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let h = parse_headers(&lines(&["content-length: 7", "ACCEPT-RANGES: Bytes"]));
        assert_eq!(h.content_length.as_deref(), Some("7"));
        assert!(h.accept_ranges);
    }

    #[test]
    fn accept_ranges_none_is_not_support() {
        let h = parse_headers(&lines(&["Accept-Ranges: none"]));
        assert!(!h.accept_ranges);
    }

    #[test]
    fn validators_are_captured() {
        let h = parse_headers(&lines(&[
            "ETag: \"v1\"",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
            "garbage line",
        ]));
        assert_eq!(h.etag.as_deref(), Some("v1"));
        assert_eq!(
            h.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn missing_or_bad_size_is_an_error() {
        let err = parse_size(None).unwrap_err();
        assert!(err.to_string().contains("unable to parse file size"));
        assert!(parse_size(Some("abc")).is_err());
        assert!(parse_size(Some("-1")).is_err());
    }
}
