//! `Range: bytes=...` parsing against a known resource size.

/// Inclusive byte range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a resource of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range header must start with \"bytes=\"")]
    MissingPrefix,
    #[error("invalid range format: {0:?}")]
    Malformed(String),
    #[error("range {start}-{end} not satisfiable for size {size}")]
    Unsatisfiable { start: u64, end: u64, size: u64 },
}

/// Parse every range in the header. Accepted forms: `a-b`, `a-` (to the end)
/// and `-n` (last `n` bytes, clamped to the size). Each resulting range must
/// satisfy `start <= end < size`.
pub fn parse_range(header: &str, size: u64) -> Result<Vec<ByteRange>, RangeError> {
    let ranges_part = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::MissingPrefix)?;

    let mut out = Vec::new();
    for part in ranges_part.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (a, b) = part
            .split_once('-')
            .ok_or_else(|| RangeError::Malformed(part.to_string()))?;
        let (a, b) = (a.trim(), b.trim());
        let number = |s: &str| {
            s.parse::<u64>()
                .map_err(|_| RangeError::Malformed(part.to_string()))
        };

        let (start, end) = match (a.is_empty(), b.is_empty()) {
            (true, true) => return Err(RangeError::Malformed(part.to_string())),
            (true, false) => {
                let suffix = number(b)?;
                (size.saturating_sub(suffix), size.wrapping_sub(1))
            }
            (false, true) => (number(a)?, size.wrapping_sub(1)),
            (false, false) => (number(a)?, number(b)?),
        };

        if size == 0 || start > end || end >= size {
            return Err(RangeError::Unsatisfiable { start, end, size });
        }
        out.push(ByteRange { start, end });
    }
    Ok(out)
}
