//! Transfer module containing the chunk planner, the concurrent engine and
//! the chunked transfer client.
//!
//! # Overview
//!
//! - `plan` - [`ChunkPlan`] partitions a byte range into [`Chunk`]s
//! - [`engine`] - drives a per-chunk operation under bounded concurrency
//! - `client` - [`TransferClient`] downloads and uploads through a pipeline
//! - `builder` / `config` - [`TransferClientBuilder`] and [`TransferConfig`]
//! - `file` - positional file access shared by concurrent chunks
//!
//! # Examples
//!
//! ```rust,no_run
//! use blobflow::http::{create_http_client, HttpClientConfig};
//! use blobflow::pipeline::PipelineBuilder;
//! use blobflow::transfer::TransferClientBuilder;
//! use blobflow::Context;
//! use reqwest::Url;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let pipeline = PipelineBuilder::new(Arc::new(client)).build()?;
//! let transfers = TransferClientBuilder::new(pipeline).concurrency(8).build();
//!
//! let url = Url::parse("https://account.blob.example.com/container/big.bin")?;
//! let result = transfers
//!     .download_to_file(&Context::new(), &url, None, Path::new("big.bin"))
//!     .await?;
//! println!("{} bytes, etag {:?}", result.size, result.properties.etag);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod engine;
pub mod file;
pub mod plan;

pub use builder::TransferClientBuilder;
pub use client::{ByteRange, DownloadResponse, TransferClient, TransferResult};
pub use config::{ChunkCallback, TransferConfig};
pub use file::SharedFile;
pub use plan::{
    auto_chunk_size, Chunk, ChunkPlan, DEFAULT_CONCURRENCY, GRAIN_SIZE, MAX_AUTO_CHUNK_SIZE,
};
