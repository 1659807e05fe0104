//! Shared fixtures: an in-memory object server with fault injection and
//! pipeline/transfer client constructors wired to it.

use async_trait::async_trait;
use blobflow::hash::{ContentHash, HashAlgorithm};
use blobflow::pipeline::{PipelineBuilder, RetryOptions};
use blobflow::transfer::{TransferClient, TransferClientBuilder};
use blobflow::utils::parse_content_range;
use blobflow::{HttpTransport, Pipeline, Response, Result};
use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, ETAG, IF_MATCH, RANGE,
};
use reqwest::{Method, StatusCode, Url};
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Common test constants
pub const TEST_URL: &str = "https://account.blob.example.com/container/blob.bin";
pub const SECONDARY_HOST: &str = "account-secondary.blob.example.com";

/// Parses the common test URL
pub fn test_url() -> Url {
    Url::parse(TEST_URL).expect("Invalid test URL")
}

/// Creates test content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Routes logs to the test output when RUST_LOG is set
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Retry options with millisecond delays
pub fn quick_retry(max_retries: u32) -> RetryOptions {
    RetryOptions {
        max_retries,
        retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(4),
        jitter: false,
        ..RetryOptions::default()
    }
}

/// Builds a standard pipeline ending in `server`
pub fn create_test_pipeline(server: &Arc<MemoryServer>, retry: RetryOptions) -> Pipeline {
    PipelineBuilder::new(Arc::clone(server) as Arc<dyn HttpTransport>)
        .telemetry("blobflow-tests", "0.0.1")
        .retry(retry)
        .build()
        .expect("Failed to build pipeline")
}

/// Builds a transfer client with small chunks over `server`
pub fn create_test_client(server: &Arc<MemoryServer>) -> TransferClient {
    TransferClientBuilder::new(create_test_pipeline(server, quick_retry(3)))
        .initial_chunk_size(1024)
        .chunk_size(1000)
        .upload_chunk_size(1000)
        .concurrency(3)
        .build()
}

/// Failure injected into one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with the given status and no body.
    Status(StatusCode),
    /// Serve the first `n` bytes of the body, then reset the connection.
    CutAfter(usize),
    /// Like `CutAfter`, and modify the resource right after.
    CutAfterAndModify(usize),
    /// End the body cleanly after `n` bytes despite the advertised length.
    TruncateAfter(usize),
    /// Answer `200` with the whole resource, ignoring `Range`.
    IgnoreRange,
}

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct Blob {
    data: Vec<u8>,
    version: u32,
}

impl Blob {
    fn etag(&self) -> String {
        format!("\"0x8D{:04}\"", self.version)
    }
}

/// An object store holding a single resource, served from memory.
///
/// `GET` honours `Range` and `If-Match` and reports `ETag`, `Content-Range`,
/// `Content-Length` and `Content-MD5`. `PUT` stores each body under the
/// start of its `Content-Range`.
pub struct MemoryServer {
    blob: Mutex<Blob>,
    faults: Mutex<Vec<(u64, Fault)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    uploads: Mutex<BTreeMap<u64, Vec<u8>>>,
    upload_total: Mutex<Option<u64>>,
    latency: Option<Duration>,
    secondary_missing: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryServer {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Blob { data, version: 1 }),
            faults: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(BTreeMap::new()),
            upload_total: Mutex::new(None),
            latency: None,
            secondary_missing: false,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answers 404 to every request sent to the secondary host.
    pub fn with_secondary_missing(mut self) -> Self {
        self.secondary_missing = true;
        self
    }

    /// Applies `fault` once, to the first request whose range starts at `offset`.
    pub fn inject(&self, offset: u64, fault: Fault) {
        self.faults.lock().unwrap().push((offset, fault));
    }

    /// Replaces the resource, changing its version.
    pub fn replace(&self, data: Vec<u8>) {
        let mut blob = self.blob.lock().unwrap();
        blob.data = data;
        blob.version += 1;
    }

    pub fn etag(&self) -> String {
        self.blob.lock().unwrap().etag()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Concatenation of every uploaded part in offset order.
    pub fn uploaded(&self) -> Vec<u8> {
        self.uploads
            .lock()
            .unwrap()
            .values()
            .flat_map(|part| part.iter().copied())
            .collect()
    }

    pub fn upload_total(&self) -> Option<u64> {
        *self.upload_total.lock().unwrap()
    }

    fn take_fault(&self, offset: u64) -> Option<Fault> {
        let mut faults = self.faults.lock().unwrap();
        let position = faults.iter().position(|(at, _)| *at == offset)?;
        Some(faults.remove(position).1)
    }

    fn get(&self, request: &reqwest::Request) -> Response {
        let range = header(request, RANGE.as_str()).and_then(parse_range);
        let fault = self.take_fault(range.map_or(0, |(start, _)| start));
        let range = range.filter(|_| fault != Some(Fault::IgnoreRange));
        if let Some(Fault::Status(status)) = fault {
            return respond(status, HeaderMap::new(), reqwest::Body::from(Bytes::new()));
        }

        let mut blob = self.blob.lock().unwrap();
        let etag = blob.etag();
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_str(&etag).unwrap());
        if let Some(expected) = header(request, IF_MATCH.as_str()) {
            if expected != etag {
                return respond(
                    StatusCode::PRECONDITION_FAILED,
                    headers,
                    reqwest::Body::from(Bytes::new()),
                );
            }
        }

        let total = blob.data.len() as u64;
        let (status, start, end) = match range {
            None => (StatusCode::OK, 0, total),
            Some((start, _)) if start >= total => {
                headers.insert(
                    CONTENT_RANGE,
                    HeaderValue::from_str(&format!("bytes */{}", total)).unwrap(),
                );
                return respond(
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    headers,
                    reqwest::Body::from(Bytes::new()),
                );
            }
            Some((start, last)) => {
                let end = last.map_or(total, |last| (last + 1).min(total));
                headers.insert(
                    CONTENT_RANGE,
                    HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end - 1, total))
                        .unwrap(),
                );
                (StatusCode::PARTIAL_CONTENT, start, end)
            }
        };

        let body = Bytes::copy_from_slice(&blob.data[start as usize..end as usize]);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(
            HeaderName::from_static("content-md5"),
            HeaderValue::from_str(&ContentHash::compute(&body, HashAlgorithm::Md5).to_base64())
                .unwrap(),
        );

        match fault {
            Some(Fault::CutAfter(n)) => respond(status, headers, cut_body(&body, n)),
            Some(Fault::CutAfterAndModify(n)) => {
                blob.version += 1;
                respond(status, headers, cut_body(&body, n))
            }
            Some(Fault::TruncateAfter(n)) => respond(
                status,
                headers,
                reqwest::Body::from(body.slice(..n.min(body.len()))),
            ),
            _ => respond(status, headers, reqwest::Body::from(body)),
        }
    }

    fn put(&self, request: &reqwest::Request) -> Response {
        let range = header(request, CONTENT_RANGE.as_str()).and_then(|v| parse_content_range(&v));
        let start = range.and_then(|r| r.start).unwrap_or(0);
        if let Some(Fault::Status(status)) = self.take_fault(start) {
            return respond(status, HeaderMap::new(), reqwest::Body::from(Bytes::new()));
        }

        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| b.to_vec())
            .unwrap_or_default();
        if let Some(md5) = header(request, "content-md5") {
            if ContentHash::compute(&body, HashAlgorithm::Md5).to_base64() != md5 {
                return respond(
                    StatusCode::BAD_REQUEST,
                    HeaderMap::new(),
                    reqwest::Body::from(Bytes::new()),
                );
            }
        }

        *self.upload_total.lock().unwrap() = range.and_then(|r| r.total);
        if range.and_then(|r| r.start).is_some() {
            self.uploads.lock().unwrap().insert(start, body);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ETAG,
            HeaderValue::from_str(&format!("\"part-{}\"", start)).unwrap(),
        );
        respond(StatusCode::CREATED, headers, reqwest::Body::from(Bytes::new()))
    }
}

#[async_trait]
impl HttpTransport for MemoryServer {
    async fn execute(&self, request: reqwest::Request) -> Result<Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        });
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = if self.secondary_missing
            && request.url().host_str() == Some(SECONDARY_HOST)
        {
            respond(
                StatusCode::NOT_FOUND,
                HeaderMap::new(),
                reqwest::Body::from(Bytes::new()),
            )
        } else if request.method() == Method::GET {
            self.get(&request)
        } else if request.method() == Method::PUT {
            self.put(&request)
        } else {
            respond(
                StatusCode::METHOD_NOT_ALLOWED,
                HeaderMap::new(),
                reqwest::Body::from(Bytes::new()),
            )
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

/// Builds a response the way the transport hands it to the pipeline
pub fn respond(status: StatusCode, headers: HeaderMap, body: reqwest::Body) -> Response {
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Response::from(response)
}

/// A body yielding the first `n` bytes, then a connection reset
fn cut_body(body: &Bytes, n: usize) -> reqwest::Body {
    let prefix = body.slice(..n.min(body.len()));
    let parts: Vec<std::result::Result<Bytes, io::Error>> = vec![
        Ok(prefix),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
    ];
    reqwest::Body::wrap_stream(futures::stream::iter(parts))
}

fn header(request: &reqwest::Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn parse_range(value: String) -> Option<(u64, Option<u64>)> {
    let (start, last) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start = start.parse().ok()?;
    let last = match last {
        "" => None,
        last => Some(last.parse().ok()?),
    };
    Some((start, last))
}
