//! Tests for utils module functionality.

use blobflow::utils::{content_length, etag, parse_content_range, parse_content_range_total};
use blobflow::ObjectProperties;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, ETAG};
use reqwest::StatusCode;

mod common;
use common::helpers::*;

#[test]
fn test_parse_content_range_total() {
    let cases = [
        ("bytes 0-1023/2048", Some(2048)),
        ("bytes 1024-2047/2048", Some(2048)),
        ("bytes */4096", Some(4096)),
        ("bytes 0-1023/*", None),
        ("invalid", None),
    ];
    for (header, expected) in cases {
        assert_eq!(parse_content_range_total(header), expected, "{}", header);
    }
}

#[test]
fn test_parse_content_range_total_edge_cases() {
    // Whitespace around the total
    assert_eq!(parse_content_range_total("bytes 0-1023/ 2048 "), Some(2048));
    assert_eq!(parse_content_range_total("bytes 0-0/0"), Some(0));
    assert_eq!(
        parse_content_range_total("bytes 0-1023/999999999999"),
        Some(999999999999)
    );
    assert_eq!(parse_content_range_total("bytes 0-1023/-1"), None);
}

#[test]
fn test_parse_content_range_rejects_other_units() {
    assert!(parse_content_range("items 0-9/10").is_none());
    assert!(parse_content_range("bytes a-9/10").is_none());
}

#[test]
fn test_properties_of_partial_response() {
    let mut headers = HeaderMap::new();
    headers.insert(ETAG, HeaderValue::from_static("\"0x8D0007\""));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
    headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes 0-1023/5000"));
    let response = respond(
        StatusCode::PARTIAL_CONTENT,
        headers,
        reqwest::Body::from(vec![0u8; 1024]),
    );

    let properties = ObjectProperties::from_headers(response.headers());
    assert_eq!(properties.etag.as_deref(), Some("\"0x8D0007\""));
    assert_eq!(properties.content_length, Some(1024));
    assert_eq!(properties.resource_size(), Some(5000));
    assert!(properties.content_md5.is_none());
}

#[test]
fn test_malformed_headers_are_ignored() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
    headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes 5-1/10"));
    headers.insert("content-md5", HeaderValue::from_static("not base64!"));

    assert_eq!(content_length(&headers), None);
    assert_eq!(etag(&headers), None);
    let properties = ObjectProperties::from_headers(&headers);
    assert_eq!(properties, ObjectProperties::default());
    assert_eq!(properties.resource_size(), None);
}

#[test]
fn test_unsatisfied_range_reports_total() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes */0"));
    let properties = ObjectProperties::from_headers(&headers);
    assert_eq!(properties.resource_size(), Some(0));
    assert_eq!(properties.content_range.and_then(|r| r.start), None);
}
