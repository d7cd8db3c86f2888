//! Parsing of the `Range` request header.
//!
//! Only the closed form `bytes=<start>-<end>` is understood. Suffix ranges
//! (`bytes=-500`), open ranges (`bytes=500-`) and multi-range requests are
//! rejected instead of being guessed at.

use crate::error::{Error, Result};

/// A byte window into an object: `length` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Parses the raw value of a `Range` header.
///
/// `None` means no range was requested, which is not an error.
pub fn parse_range(encoded: Option<&str>) -> Result<Option<ByteRange>> {
    let Some(encoded) = encoded else {
        return Ok(None);
    };

    let malformed = || Error::RangeFormat(encoded.to_string());

    let bounds = encoded.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
    let parts: Vec<&str> = bounds.split('-').collect();
    let [start, end] = parts.as_slice() else {
        return Err(malformed());
    };

    let start: u64 = start.trim().parse().map_err(|_| malformed())?;
    let end: u64 = end.trim().parse().map_err(|_| malformed())?;
    // Also rejects end < start, and a window of 2^64 bytes.
    let length = end
        .checked_sub(start)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(malformed)?;

    Ok(Some(ByteRange { offset: start, length }))
}
