//! Header extraction utilities.
//!
//! Range transfers rely on a handful of response headers: `Content-Range`
//! to learn the full size of a resource from a partial response, `ETag` to
//! pin the version being transferred, and `Content-MD5` to validate content.

use crate::hash::{ContentHash, HashAlgorithm};

use reqwest::header::{
    HeaderMap, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};

/// Name of the header carrying a base64 MD5 digest of the body.
pub const CONTENT_MD5: &str = "content-md5";

/// A parsed `Content-Range` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte position, `None` for the unsatisfied form `bytes */total`.
    pub start: Option<u64>,
    /// Last byte position (inclusive).
    pub end: Option<u64>,
    /// Full resource size, `None` when the server answered `*`.
    pub total: Option<u64>,
}

/// Parse a `Content-Range` header value.
///
/// Accepts `bytes start-end/total`, `bytes start-end/*` and `bytes */total`.
///
/// # Example
///
/// ```rust
/// use blobflow::utils::parse_content_range;
///
/// let range = parse_content_range("bytes 200-1023/5000").unwrap();
/// assert_eq!(range.end, Some(1023));
/// assert!(parse_content_range("bytes 0-1023").is_none());
/// ```
pub fn parse_content_range(content_range: &str) -> Option<ContentRange> {
    let rest = content_range.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse::<u64>().ok()?),
    };
    let (start, end) = match range.trim() {
        "*" => (None, None),
        r => {
            let (start, end) = r.split_once('-')?;
            let start = start.trim().parse::<u64>().ok()?;
            let end = end.trim().parse::<u64>().ok()?;
            if end < start {
                return None;
            }
            (Some(start), Some(end))
        }
    };
    Some(ContentRange { start, end, total })
}

/// Parse a `Content-Range` header value and return the total size.
///
/// ```rust
/// use blobflow::utils::parse_content_range_total;
///
/// assert_eq!(parse_content_range_total("bytes 0-1023/2048"), Some(2048));
/// assert_eq!(parse_content_range_total("invalid"), None);
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    parse_content_range(content_range).and_then(|range| range.total)
}

/// Reads the `Content-Length` header.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Reads the `ETag` header.
pub fn etag(headers: &HeaderMap) -> Option<String> {
    header_string(headers, ETAG.as_str())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// Properties of a remote resource as reported by one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectProperties {
    /// Version token of the resource.
    pub etag: Option<String>,
    /// Raw `Last-Modified` value.
    pub last_modified: Option<String>,
    /// Length of this response's body.
    pub content_length: Option<u64>,
    /// Range covered by this response, for partial responses.
    pub content_range: Option<ContentRange>,
    /// Media type of the resource.
    pub content_type: Option<String>,
    /// MD5 digest advertised for this response's body.
    pub content_md5: Option<ContentHash>,
}

impl ObjectProperties {
    /// Extracts the properties from response headers.
    ///
    /// Malformed optional headers are ignored rather than rejected.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            etag: etag(headers),
            last_modified: header_string(headers, LAST_MODIFIED.as_str()),
            content_length: content_length(headers),
            content_range: header_string(headers, CONTENT_RANGE.as_str())
                .and_then(|value| parse_content_range(&value)),
            content_type: header_string(headers, CONTENT_TYPE.as_str()),
            content_md5: header_string(headers, CONTENT_MD5)
                .and_then(|value| ContentHash::from_base64(&value, HashAlgorithm::Md5).ok()),
        }
    }

    /// Full size of the resource: the `Content-Range` total when present,
    /// otherwise the body length.
    pub fn resource_size(&self) -> Option<u64> {
        match self.content_range {
            Some(range) => range.total,
            None => self.content_length,
        }
    }
}
