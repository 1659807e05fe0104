//! Builder pattern implementation for creating TransferClient instances.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::http::{create_http_client, HttpClientConfig};
//! use blobflow::pipeline::PipelineBuilder;
//! use blobflow::transfer::TransferClientBuilder;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let pipeline = PipelineBuilder::new(Arc::new(client)).build()?;
//!
//! let transfers = TransferClientBuilder::new(pipeline)
//!     .concurrency(8)
//!     .validate_content(true)
//!     .on_chunk_complete(|chunk| println!("chunk {} done", chunk.index))
//!     .build();
//! # Ok(())
//! # }
//! ```

use super::client::TransferClient;
use super::config::TransferConfig;
use super::plan::Chunk;
use crate::pipeline::Pipeline;
use crate::stream::ReliableStreamOptions;

use std::sync::Arc;

/// A builder used to create a [`TransferClient`].
#[derive(Debug)]
pub struct TransferClientBuilder {
    pipeline: Arc<Pipeline>,
    config: TransferConfig,
}

impl TransferClientBuilder {
    /// Creates a builder with the default options, sending through `pipeline`.
    pub fn new(pipeline: impl Into<Arc<Pipeline>>) -> Self {
        Self {
            pipeline: pipeline.into(),
            config: TransferConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of chunks in flight.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set a fixed download chunk size instead of the automatic one.
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.config.chunk_size = Some(chunk_size);
        self
    }

    /// Set the size of the first download request.
    pub fn initial_chunk_size(mut self, size: u64) -> Self {
        self.config.initial_chunk_size = size;
        self
    }

    /// Set the upload chunk size.
    pub fn upload_chunk_size(mut self, size: u64) -> Self {
        self.config.upload_chunk_size = size;
        self
    }

    /// Send and verify `Content-MD5` digests.
    pub fn validate_content(mut self, validate: bool) -> Self {
        self.config.validate_content = validate;
        self
    }

    /// Set how many consecutive failed reads a download body may resume from.
    pub fn max_resume_attempts(mut self, attempts: u32) -> Self {
        self.config.stream_options = ReliableStreamOptions {
            max_resume_attempts: attempts,
        };
        self
    }

    /// Set callback for when each chunk completes.
    ///
    /// Chunks complete in any order; the callback may run concurrently with
    /// chunks that are still in flight.
    pub fn on_chunk_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Chunk) + Send + Sync + 'static,
    {
        self.config.on_chunk_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Create the [`TransferClient`] with the specified options.
    pub fn build(self) -> TransferClient {
        TransferClient::new(self.pipeline, self.config)
    }
}
