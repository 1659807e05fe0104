//! Chunked downloads and uploads over a pipeline.
//!
//! Downloads start with a single request of `initial_chunk_size` bytes that
//! also reveals the total size through `Content-Range`. The remainder is
//! fetched concurrently, every chunk pinned to the first response's `ETag`
//! with `If-Match`, so a resource modified mid-transfer fails with
//! [`Error::ResourceChanged`] instead of producing a mix of versions. Each
//! chunk body is read through a [`ReliableStream`].
//!
//! Uploads send every chunk as a `PUT` carrying
//! `Content-Range: bytes <first>-<last>/<total>`.
//!
//! The properties reported for a transfer are the ones returned with the
//! chunk of highest index.

use super::config::TransferConfig;
use super::engine;
use super::file::SharedFile;
use super::plan::{auto_chunk_size, Chunk, ChunkPlan};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hash::{ContentHash, HashAlgorithm};
use crate::http::{Body, Request, Response};
use crate::pipeline::Pipeline;
use crate::stream::{ReliableStream, ResumedBody};
use crate::utils::{etag, ObjectProperties, CONTENT_MD5};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderName, CONTENT_RANGE, IF_MATCH, RANGE};
use reqwest::{Method, StatusCode, Url};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A byte range of a remote resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte.
    pub offset: u64,
    /// Number of bytes, or everything from `offset` on when `None`.
    pub length: Option<u64>,
}

impl ByteRange {
    /// Creates a range.
    pub fn new(offset: u64, length: Option<u64>) -> Self {
        Self { offset, length }
    }

    /// The `Range` header value.
    pub fn header_value(&self) -> Result<String> {
        match self.length {
            Some(0) => Err(Error::InvalidArgument("byte range is empty".into())),
            Some(length) => Ok(format!("bytes={}-{}", self.offset, self.offset + length - 1)),
            None => Ok(format!("bytes={}-", self.offset)),
        }
    }

    /// The part of this range left after `consumed` bytes.
    fn skip(&self, consumed: u64) -> Self {
        Self {
            offset: self.offset + consumed,
            length: self.length.map(|l| l.saturating_sub(consumed)),
        }
    }
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Properties returned with the last chunk.
    pub properties: ObjectProperties,
    /// Bytes transferred.
    pub size: u64,
}

/// A download whose body has not been read yet.
pub struct DownloadResponse {
    /// Response status, `206` for ranged downloads.
    pub status: StatusCode,
    /// Properties of the resource.
    pub properties: ObjectProperties,
    /// The body, resuming on transient failures.
    pub body: ReliableStream,
}

impl fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("status", &self.status)
            .field("properties", &self.properties)
            .field("body", &self.body)
            .finish()
    }
}

struct FirstChunk {
    properties: ObjectProperties,
    /// Where the downloaded range starts.
    offset: u64,
    /// Bytes in the downloaded range.
    range_size: u64,
    data: Vec<u8>,
}

/// Chunks of a download left after the first request.
struct Progress {
    plan: Option<ChunkPlan>,
    count: usize,
}

impl Progress {
    /// Reports a planned chunk, numbered after the first request.
    fn completed(&self, client: &TransferClient, chunk: Chunk) {
        client.chunk_completed(&Chunk {
            index: chunk.index + 1,
            count: self.count,
            ..chunk
        });
    }
}

/// Transfers resources in chunks through a shared [`Pipeline`].
///
/// A client can be created via its builder:
///
/// ```rust
/// use blobflow::http::{create_http_client, HttpClientConfig};
/// use blobflow::pipeline::PipelineBuilder;
/// use blobflow::transfer::TransferClientBuilder;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = create_http_client(HttpClientConfig::default())?;
/// let pipeline = PipelineBuilder::new(Arc::new(client)).build()?;
/// let transfers = TransferClientBuilder::new(pipeline).build();
/// assert_eq!(transfers.config().concurrency, 5);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TransferClient {
    pipeline: Arc<Pipeline>,
    config: TransferConfig,
}

impl fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferClient")
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish()
    }
}

impl TransferClient {
    /// Creates a new TransferClient with the given configuration.
    pub(crate) fn new(pipeline: Arc<Pipeline>, config: TransferConfig) -> Self {
        Self { pipeline, config }
    }

    /// Gets the pipeline requests are sent through.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Gets the configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Downloads `range` of the resource at `url`, or all of it.
    ///
    /// The body is not read; a transient failure while reading it resumes
    /// from the current offset.
    pub async fn download(
        &self,
        ctx: &Context,
        url: &Url,
        range: Option<ByteRange>,
    ) -> Result<DownloadResponse> {
        let response = send_get(&self.pipeline, ctx, url, range, None).await?;
        let response = expect_success(response, None)?;
        let status = response.status();
        let properties = ObjectProperties::from_headers(response.headers());
        let body = self.reliable_body(ctx, url, range.unwrap_or_default(), response);
        Ok(DownloadResponse {
            status,
            properties,
            body,
        })
    }

    /// Downloads `range` of the resource at `url`, or all of it, into
    /// `buffer`.
    ///
    /// Fails with [`Error::InvalidArgument`] when the bytes do not fit.
    /// On failure the buffer may be partially written.
    pub async fn download_to_buffer(
        &self,
        ctx: &Context,
        url: &Url,
        range: Option<ByteRange>,
        buffer: &mut [u8],
    ) -> Result<TransferResult> {
        let first = self.first_chunk(ctx, url, range.unwrap_or_default()).await?;
        let size = usize::try_from(first.range_size)
            .ok()
            .filter(|size| *size <= buffer.len())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "buffer of {} bytes cannot hold {} bytes",
                    buffer.len(),
                    first.range_size
                ))
            })?;
        let head = first.data.len();
        buffer[..head].copy_from_slice(&first.data);

        let progress = self.start_progress(&first)?;
        let properties = match progress.plan {
            None => first.properties,
            Some(plan) => {
                let if_match = first.properties.etag.as_deref();
                let progress = &progress;
                engine::run_into(
                    ctx,
                    plan.base(),
                    &mut buffer[head..size],
                    plan.chunk_size(),
                    self.config.concurrency,
                    move |ctx, chunk, slice| async move {
                        let properties =
                            self.read_chunk(&ctx, url, chunk, if_match, slice).await?;
                        progress.completed(self, chunk);
                        Ok::<_, Error>(properties)
                    },
                )
                .await?
            }
        };

        info!(url = %url, size = first.range_size, "Download finished");
        Ok(TransferResult {
            properties,
            size: first.range_size,
        })
    }

    /// Downloads `range` of the resource at `url`, or all of it, into a file
    /// at `path`, replacing the file.
    ///
    /// On failure the file may be partially written.
    pub async fn download_to_file(
        &self,
        ctx: &Context,
        url: &Url,
        range: Option<ByteRange>,
        path: &Path,
    ) -> Result<TransferResult> {
        let first = self.first_chunk(ctx, url, range.unwrap_or_default()).await?;
        let progress = self.start_progress(&first)?;
        let base = first.offset;

        let file = SharedFile::create(path).await?;
        file.set_len(first.range_size).await?;
        file.write_at(0, first.data).await?;

        let properties = match progress.plan {
            None => first.properties,
            Some(plan) => {
                let if_match = first.properties.etag.as_deref();
                let (file, progress) = (&file, &progress);
                engine::run_plan(
                    ctx,
                    plan,
                    self.config.concurrency,
                    move |ctx, chunk| async move {
                        let mut data = vec![0u8; chunk.length as usize];
                        let properties = self
                            .read_chunk(&ctx, url, chunk, if_match, &mut data)
                            .await?;
                        file.write_at(chunk.offset - base, data).await?;
                        progress.completed(self, chunk);
                        Ok::<_, Error>(properties)
                    },
                )
                .await?
            }
        };
        file.sync().await?;

        info!(url = %url, path = %path.display(), size = first.range_size, "Download finished");
        Ok(TransferResult {
            properties,
            size: first.range_size,
        })
    }

    /// Uploads `data` to `url` in chunks.
    ///
    /// An empty upload still sends a single request with
    /// `Content-Range: bytes */0`.
    pub async fn upload_from_buffer(
        &self,
        ctx: &Context,
        url: &Url,
        data: impl Into<Bytes>,
    ) -> Result<TransferResult> {
        let data: Bytes = data.into();
        let total = data.len() as u64;
        let data = &data;
        let properties = engine::run(
            ctx,
            total,
            self.config.upload_chunk_size,
            self.config.concurrency,
            move |ctx, chunk| async move {
                let part = data.slice(chunk.offset as usize..chunk.end() as usize);
                self.upload_chunk(&ctx, url, chunk, total, part).await
            },
        )
        .await?;

        info!(url = %url, size = total, "Upload finished");
        Ok(TransferResult {
            properties,
            size: total,
        })
    }

    /// Uploads the file at `path` to `url` in chunks.
    pub async fn upload_from_file(
        &self,
        ctx: &Context,
        url: &Url,
        path: &Path,
    ) -> Result<TransferResult> {
        let file = SharedFile::open(path).await?;
        let total = file.size().await?;
        let file = &file;
        let properties = engine::run(
            ctx,
            total,
            self.config.upload_chunk_size,
            self.config.concurrency,
            move |ctx, chunk| async move {
                let part = file.read_at(chunk.offset, chunk.length).await?;
                self.upload_chunk(&ctx, url, chunk, total, Bytes::from(part))
                    .await
            },
        )
        .await?;

        info!(url = %url, path = %path.display(), size = total, "Upload finished");
        Ok(TransferResult {
            properties,
            size: total,
        })
    }

    async fn first_chunk(
        &self,
        ctx: &Context,
        url: &Url,
        range: ByteRange,
    ) -> Result<FirstChunk> {
        let initial = self.config.initial_chunk_size;
        if initial == 0 {
            return Err(Error::InvalidArgument(
                "initial chunk size must be positive".into(),
            ));
        }
        let requested = range.length.map_or(initial, |length| length.min(initial));
        let first_range = ByteRange::new(range.offset, Some(requested));
        let response = send_get(&self.pipeline, ctx, url, Some(first_range), None).await?;

        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            let properties = ObjectProperties::from_headers(response.headers());
            if properties.content_range.and_then(|r| r.total) == Some(range.offset) {
                debug!(url = %url, offset = range.offset, "Nothing to download");
                return Ok(FirstChunk {
                    properties,
                    offset: range.offset,
                    range_size: 0,
                    data: Vec::new(),
                });
            }
        }

        let response = expect_success(response, None)?;
        let partial = response.status() == StatusCode::PARTIAL_CONTENT;
        if !partial && range.offset > 0 {
            return Err(Error::UnexpectedStatus {
                status: response.status(),
                url: response.url().clone(),
            });
        }
        let properties = ObjectProperties::from_headers(response.headers());
        let total = properties.resource_size().ok_or_else(|| {
            Error::Internal(format!("response for {} does not reveal its size", url))
        })?;
        let available = total.saturating_sub(range.offset);
        let range_size = range.length.map_or(available, |length| length.min(available));
        let length = if partial {
            range_size.min(requested)
        } else {
            range_size
        };
        debug!(url = %url, total, range = range_size, first = length, "Download started");

        let mut data = vec![0u8; length as usize];
        let mut body =
            self.reliable_body(ctx, url, ByteRange::new(range.offset, Some(length)), response);
        body.read_exact(&mut data).await?;
        self.verify(&properties, &data)?;

        Ok(FirstChunk {
            properties,
            offset: range.offset,
            range_size,
            data,
        })
    }

    /// Plans what is left after the first chunk and reports the first chunk.
    ///
    /// The first request counts as chunk 0 of the whole download; the
    /// planned chunks follow it.
    fn start_progress(&self, first: &FirstChunk) -> Result<Progress> {
        let head = first.data.len() as u64;
        let remaining = first.range_size - head;
        let plan = if remaining == 0 {
            None
        } else {
            Some(ChunkPlan::with_offset(
                first.offset + head,
                remaining,
                self.chunk_size_for(remaining),
            )?)
        };
        let count = plan.map_or(1, |plan| plan.chunk_count() + 1);
        self.chunk_completed(&Chunk {
            index: 0,
            count,
            offset: first.offset,
            length: head,
        });
        Ok(Progress { plan, count })
    }

    async fn read_chunk(
        &self,
        ctx: &Context,
        url: &Url,
        chunk: Chunk,
        if_match: Option<&str>,
        dest: &mut [u8],
    ) -> Result<ObjectProperties> {
        let range = ByteRange::new(chunk.offset, Some(chunk.length));
        let response = send_get(&self.pipeline, ctx, url, Some(range), if_match).await?;
        let response = expect_success(response, if_match)?;
        let properties = ObjectProperties::from_headers(response.headers());
        let mut body = self.reliable_body(ctx, url, range, response);
        body.read_exact(dest).await?;
        self.verify(&properties, dest)?;
        Ok(properties)
    }

    async fn upload_chunk(
        &self,
        ctx: &Context,
        url: &Url,
        chunk: Chunk,
        total: u64,
        data: Bytes,
    ) -> Result<ObjectProperties> {
        let content_range = if total == 0 {
            "bytes */0".to_string()
        } else {
            format!("bytes {}-{}/{}", chunk.offset, chunk.end() - 1, total)
        };
        let mut request = Request::new(Method::PUT, url.clone());
        request.insert_header_str(CONTENT_RANGE, &content_range)?;
        if self.config.validate_content {
            let hash = ContentHash::compute(&data, HashAlgorithm::Md5);
            request.insert_header_str(HeaderName::from_static(CONTENT_MD5), &hash.to_base64())?;
        }
        request.set_body(Body::from(data));

        let response = self.pipeline.send(ctx, request).await?;
        let response = expect_success(response, None)?;
        let properties = ObjectProperties::from_headers(response.headers());
        self.chunk_completed(&chunk);
        Ok(properties)
    }

    /// Wraps `response` so that its body resumes within `range`.
    fn reliable_body(
        &self,
        ctx: &Context,
        url: &Url,
        range: ByteRange,
        response: Response,
    ) -> ReliableStream {
        let pipeline = Arc::clone(&self.pipeline);
        let url = url.clone();
        let version = etag(response.headers());
        let resume = move |ctx: Context, offset: u64| {
            let pipeline = Arc::clone(&pipeline);
            let url = url.clone();
            let version = version.clone();
            let rest = range.skip(offset);
            async move {
                if rest.length == Some(0) {
                    return Ok(ResumedBody {
                        body: stream::empty().boxed(),
                        version,
                    });
                }
                let response = send_get(&pipeline, &ctx, &url, Some(rest), None).await?;
                let response = expect_partial(expect_success(response, None)?, rest.offset)?;
                Ok::<_, Error>(ResumedBody::from_response(response))
            }
        };
        ReliableStream::from_response(ctx, response, self.config.stream_options, resume)
    }

    fn verify(&self, properties: &ObjectProperties, data: &[u8]) -> Result<()> {
        match &properties.content_md5 {
            Some(expected) if self.config.validate_content => expected.verify(data),
            _ => Ok(()),
        }
    }

    fn chunk_size_for(&self, remaining: u64) -> u64 {
        self.config
            .chunk_size
            .unwrap_or_else(|| auto_chunk_size(remaining, self.config.concurrency))
    }

    fn chunk_completed(&self, chunk: &Chunk) {
        if let Some(callback) = &self.config.on_chunk_complete {
            callback(chunk);
        }
    }
}

async fn send_get(
    pipeline: &Pipeline,
    ctx: &Context,
    url: &Url,
    range: Option<ByteRange>,
    if_match: Option<&str>,
) -> Result<Response> {
    let mut request = Request::new(Method::GET, url.clone());
    if let Some(range) = range {
        request.insert_header_str(RANGE, &range.header_value()?)?;
    }
    if let Some(etag) = if_match {
        request.insert_header_str(IF_MATCH, etag)?;
    }
    pipeline.send(ctx, request).await
}

/// Accepts only a partial response starting at `offset`, so that a server
/// ignoring `Range` cannot splice the start of the resource into a body.
fn expect_partial(response: Response, offset: u64) -> Result<Response> {
    let start = ObjectProperties::from_headers(response.headers())
        .content_range
        .and_then(|range| range.start);
    if response.status() != StatusCode::PARTIAL_CONTENT || start != Some(offset) {
        return Err(Error::UnexpectedStatus {
            status: response.status(),
            url: response.url().clone(),
        });
    }
    Ok(response)
}

/// Maps a failed response to an error. A `412` answering `If-Match` means
/// the resource changed.
fn expect_success(response: Response, if_match: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::PRECONDITION_FAILED {
        if let Some(expected) = if_match {
            return Err(Error::ResourceChanged {
                expected: expected.to_string(),
                found: etag(response.headers()).unwrap_or_else(|| "<unknown>".to_string()),
            });
        }
    }
    Err(Error::UnexpectedStatus {
        status,
        url: response.url().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header_values() {
        assert_eq!(
            ByteRange::new(0, Some(4)).header_value().unwrap(),
            "bytes=0-3"
        );
        assert_eq!(ByteRange::new(7, None).header_value().unwrap(), "bytes=7-");
        assert!(ByteRange::new(7, Some(0)).header_value().is_err());
    }

    #[test]
    fn test_range_skip() {
        let range = ByteRange::new(100, Some(50));
        assert_eq!(range.skip(20), ByteRange::new(120, Some(30)));
        assert_eq!(ByteRange::new(5, None).skip(5), ByteRange::new(10, None));
    }
}
