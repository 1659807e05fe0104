//! Blobflow is the transport-resilience core of an object storage client:
//! an ordered request pipeline, retries with secondary-host failover,
//! self-healing download bodies, and bounded-concurrency chunked transfers
//! validated with incremental content hashes.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use blobflow::http::{create_http_client, HttpClientConfig};
//! use blobflow::pipeline::{PipelineBuilder, RetryOptions};
//! use blobflow::transfer::TransferClientBuilder;
//! use blobflow::{Context, Error};
//! use reqwest::Url;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let pipeline = PipelineBuilder::new(Arc::new(client))
//!     .telemetry("my-app", "1.0.0")
//!     .retry(RetryOptions {
//!         secondary_host: Some("account-secondary.blob.example.com".into()),
//!         ..RetryOptions::default()
//!     })
//!     .build()?;
//!
//! let transfers = TransferClientBuilder::new(pipeline).concurrency(8).build();
//! let ctx = Context::new().with_timeout(Duration::from_secs(600));
//! let url = Url::parse("https://account.blob.example.com/container/blob.bin")
//!     .map_err(|e| Error::InvalidUrl(e.to_string()))?;
//!
//! let mut buffer = vec![0u8; 64 * 1024 * 1024];
//! let result = transfers.download_to_buffer(&ctx, &url, None, &mut buffer).await?;
//! println!("downloaded {} bytes", result.size);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`context`] - Cancellation and deadline propagation
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`hash`] - Incremental content hashing
//! - [`http`] - Requests, bodies, the HTTP client and transports
//! - [`pipeline`] - The policy chain and the standard policies
//! - [`stream`] - Resumable response bodies
//! - [`transfer`] - Chunk planning, the concurrent engine and the transfer client
//! - [`utils`] - Shared header utilities

pub mod context;
pub mod error;
pub mod hash;
pub mod http;
pub mod pipeline;
pub mod stream;
pub mod transfer;
pub mod utils;

pub use context::Context;
pub use error::{Error, Result};
pub use hash::{ContentHash, HashAlgorithm, Md5Hash, StreamingHash};
pub use http::{create_http_client, Body, HttpClientConfig, HttpTransport, Request, Response};
pub use pipeline::{Next, Pipeline, PipelineBuilder, Policy, RetryOptions};
pub use stream::{ReliableStream, ReliableStreamOptions, ResumedBody};
pub use transfer::{Chunk, ChunkPlan, TransferClient, TransferClientBuilder, TransferResult};
pub use utils::ObjectProperties;
