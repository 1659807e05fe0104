//! Error handling for the blobflow library.
//!
//! Every layer of the transport core reports failures through the single
//! [`Error`] enum below. The variants fall into a handful of classes that
//! drive the retry decisions made by [`RetryPolicy`] and [`ReliableStream`]:
//!
//! - usage errors ([`Error::InvalidArgument`], [`Error::Usage`]) are never retried;
//! - transient transport errors (see [`Error::is_transient`]) may be retried;
//! - [`Error::ResourceChanged`] is surfaced immediately;
//! - cancellation ([`Error::Cancelled`], [`Error::DeadlineExceeded`]) propagates
//!   through every layer untouched.
//!
//! [`RetryPolicy`]: crate::pipeline::RetryPolicy
//! [`ReliableStream`]: crate::stream::ReliableStream

use reqwest::{StatusCode, Url};
use reqwest_retry::{default_on_request_failure, Retryable};
use std::io;
use thiserror::Error;

/// Errors that can happen when using blobflow.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// Captures invariant violations that do not fit into other categories.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An argument was rejected before any work was done.
    ///
    /// Returned for an empty policy list, a zero chunk size or concurrency,
    /// a destination buffer that is too small, or a body that cannot be
    /// replayed under a retrying pipeline.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An object was used in a state that does not allow the call.
    ///
    /// Appending to or finalizing a hash that was already finalized ends here.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O Error.
    ///
    /// Wraps standard I/O errors raised while reading or writing local files.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    ///
    /// Typically raised while streaming a response body.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware-enabled HTTP client.
    #[error("Transport error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// A response body ended before delivering the advertised number of bytes.
    #[error("Body ended early: expected {expected} bytes, received {received}")]
    UnexpectedEof { expected: u64, received: u64 },

    /// The retry budget was exhausted on a transport failure.
    #[error("Operation failed after {attempts} attempts")]
    OperationFailed {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The remote resource changed while it was being transferred.
    #[error("Resource was modified during transfer: expected version {expected}, found {found}")]
    ResourceChanged { expected: String, found: String },

    /// The service answered with a status the operation cannot handle.
    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: Url },

    /// Transferred content does not match its advertised hash.
    #[error("Content hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The operation was cancelled through its context.
    #[error("Operation was cancelled")]
    Cancelled,

    /// The deadline carried by the context has passed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Whether the failure belongs to the transient transport class.
    ///
    /// Only these failures may be absorbed and converted into a retry or a
    /// stream resume.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Reqwest { source } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.is_request()
                    || source.is_body()
                    || source.is_decode()
            }
            Error::Middleware { source } => {
                matches!(default_on_request_failure(source), Some(Retryable::Transient))
            }
            Error::IOError { .. } | Error::UnexpectedEof { .. } => true,
            _ => false,
        }
    }

    /// Whether the failure comes from a cancelled context or an expired deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// Result type alias for operations that can fail with a blobflow error.
pub type Result<T> = std::result::Result<T, Error>;
