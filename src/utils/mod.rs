//! Shared utility functions.
//!
//! This module contains the header parsing helpers used across the pipeline,
//! the reliable stream and the transfer client.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::utils::{parse_content_range, parse_content_range_total};
//!
//! let range = parse_content_range("bytes 0-1023/2048").unwrap();
//! assert_eq!(range.start, Some(0));
//! assert_eq!(range.total, Some(2048));
//!
//! assert_eq!(parse_content_range_total("bytes */0"), Some(0));
//! ```

pub mod headers;

pub use headers::{
    content_length, etag, parse_content_range, parse_content_range_total, ContentRange,
    ObjectProperties, CONTENT_MD5,
};
