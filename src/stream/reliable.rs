//! Resumable body reader.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::Response;
use crate::utils::{content_length, etag};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// A streamed body.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Converts a response into its body stream.
pub(crate) fn response_body(response: Response) -> BodyStream {
    response.bytes_stream().map_err(Error::from).boxed()
}

/// Options of a [`ReliableStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReliableStreamOptions {
    /// Consecutive failed reads tolerated before the failure is surfaced.
    pub max_resume_attempts: u32,
}

impl Default for ReliableStreamOptions {
    fn default() -> Self {
        Self {
            max_resume_attempts: 3,
        }
    }
}

/// A body obtained by resuming, positioned at the requested offset.
pub struct ResumedBody {
    /// The remaining bytes.
    pub body: BodyStream,
    /// Version token reported with the new body.
    pub version: Option<String>,
}

impl ResumedBody {
    /// Takes body and version from a response.
    pub fn from_response(response: Response) -> Self {
        let version = etag(response.headers());
        Self {
            body: response_body(response),
            version,
        }
    }
}

impl fmt::Debug for ResumedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumedBody")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Re-requests a resource from `offset`, counted from the start of the
/// original body.
#[async_trait]
pub trait Resume: Send + Sync {
    async fn resume(&self, ctx: &Context, offset: u64) -> Result<ResumedBody>;
}

#[async_trait]
impl<F, Fut> Resume for F
where
    F: Fn(Context, u64) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResumedBody>> + Send + 'static,
{
    async fn resume(&self, ctx: &Context, offset: u64) -> Result<ResumedBody> {
        (self)(ctx.clone(), offset).await
    }
}

/// A body reader that survives transient mid-stream failures.
///
/// The cursor tracks the bytes delivered so far, the version token of the
/// original response and, when known, the bytes still to come. A body that
/// ends while bytes are still expected is treated as a failed read.
pub struct ReliableStream {
    inner: BodyStream,
    ctx: Context,
    options: ReliableStreamOptions,
    resume: Box<dyn Resume>,
    offset: u64,
    version: Option<String>,
    remaining: Option<u64>,
    failures: u32,
    buffered: Bytes,
}

impl ReliableStream {
    /// Wraps `inner`, whose version token is `version` and whose length, if
    /// known, is `length`.
    pub fn new<R>(
        ctx: &Context,
        inner: BodyStream,
        version: Option<String>,
        length: Option<u64>,
        options: ReliableStreamOptions,
        resume: R,
    ) -> Self
    where
        R: Resume + 'static,
    {
        Self {
            inner,
            ctx: ctx.clone(),
            options,
            resume: Box::new(resume),
            offset: 0,
            version,
            remaining: length,
            failures: 0,
            buffered: Bytes::new(),
        }
    }

    /// Wraps the body of `response`, taking version and length from its
    /// `ETag` and `Content-Length` headers.
    pub fn from_response<R>(
        ctx: &Context,
        response: Response,
        options: ReliableStreamOptions,
        resume: R,
    ) -> Self
    where
        R: Resume + 'static,
    {
        let version = etag(response.headers());
        let length = content_length(response.headers());
        Self::new(ctx, response_body(response), version, length, options, resume)
    }

    /// Bytes delivered so far.
    pub fn offset(&self) -> u64 {
        self.offset - self.buffered.len() as u64
    }

    /// Version token of the original response.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Bytes still expected, if the length is known.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining.map(|r| r + self.buffered.len() as u64)
    }

    /// Reads the next non-empty chunk, or `None` at the end of the body.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if !self.buffered.is_empty() {
            return Ok(Some(std::mem::take(&mut self.buffered)));
        }
        loop {
            let ctx = &self.ctx;
            let inner = &mut self.inner;
            let item = ctx.run(async move { Ok(inner.next().await) }).await?;
            let failure = match item {
                Some(Ok(bytes)) if bytes.is_empty() => continue,
                Some(Ok(bytes)) => {
                    self.offset += bytes.len() as u64;
                    self.remaining = self
                        .remaining
                        .map(|r| r.saturating_sub(bytes.len() as u64));
                    self.failures = 0;
                    return Ok(Some(bytes));
                }
                Some(Err(e)) if e.is_transient() => e,
                Some(Err(e)) => return Err(e),
                None => match self.remaining {
                    Some(remaining) if remaining > 0 => Error::UnexpectedEof {
                        expected: self.offset + remaining,
                        received: self.offset,
                    },
                    _ => return Ok(None),
                },
            };
            self.recover(failure).await?;
        }
    }

    async fn recover(&mut self, failure: Error) -> Result<()> {
        if self.failures >= self.options.max_resume_attempts {
            warn!(
                offset = self.offset,
                attempts = self.failures,
                error = %failure,
                "Giving up on interrupted body"
            );
            return Err(failure);
        }
        self.failures += 1;
        debug!(
            offset = self.offset,
            attempt = self.failures,
            error = %failure,
            "Resuming interrupted body"
        );

        let resumed = self
            .ctx
            .run(self.resume.resume(&self.ctx, self.offset))
            .await?;
        if let Some(expected) = &self.version {
            if resumed.version.as_deref() != Some(expected.as_str()) {
                return Err(Error::ResourceChanged {
                    expected: expected.clone(),
                    found: resumed.version.unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }
        self.inner = resumed.body;
        Ok(())
    }

    /// Reads up to `buf.len()` bytes, returning 0 at the end of the body.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.buffered.is_empty() {
            match self.next_chunk().await? {
                Some(chunk) => self.buffered = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.buffered.len());
        buf[..n].copy_from_slice(&self.buffered.split_to(n));
        Ok(n)
    }

    /// Fills `buf` entirely.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::UnexpectedEof {
                    expected: self.offset() + (buf.len() - filled) as u64,
                    received: self.offset(),
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Reads the rest of the body.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.remaining().unwrap_or(0).min(1 << 24) as usize);
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Turns the reader into a stream of chunks.
    pub fn into_stream(self) -> BodyStream {
        stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_chunk().await?.map(|chunk| (chunk, reader)))
        })
        .boxed()
    }
}

impl fmt::Debug for ReliableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReliableStream")
            .field("offset", &self.offset())
            .field("version", &self.version)
            .field("remaining", &self.remaining())
            .field("failures", &self.failures)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
