//! Configuration structures and defaults for the transfer client.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::transfer::{ChunkCallback, TransferConfig};
//!
//! let callback: ChunkCallback = Box::new(|chunk| {
//!     println!("chunk {}/{} done ({} bytes)", chunk.index + 1, chunk.count, chunk.length);
//! });
//!
//! let config = TransferConfig {
//!     concurrency: 8,
//!     validate_content: true,
//!     ..TransferConfig::default()
//! };
//! assert_eq!(config.initial_chunk_size, 4 * 1024 * 1024);
//! ```

use super::plan::{Chunk, DEFAULT_CONCURRENCY};
use crate::stream::ReliableStreamOptions;

use std::fmt;
use std::sync::Arc;

/// Callback type for chunk completion events.
pub type ChunkCallback = Box<dyn Fn(&Chunk) + Send + Sync>;

/// Size of the first download request, which also discovers the total size.
pub const DEFAULT_INITIAL_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Size of upload chunks.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Configuration structure for the transfer client.
#[derive(Clone)]
pub struct TransferConfig {
    /// Maximum number of chunks in flight.
    pub concurrency: usize,
    /// Size of download chunks after the first; picked from the remaining
    /// size when `None`.
    pub chunk_size: Option<u64>,
    /// Size of the first download request.
    pub initial_chunk_size: u64,
    /// Size of upload chunks.
    pub upload_chunk_size: u64,
    /// Send and verify `Content-MD5` digests.
    pub validate_content: bool,
    /// Resume behaviour of downloaded bodies.
    pub stream_options: ReliableStreamOptions,
    /// Called whenever a chunk completes.
    pub on_chunk_complete: Option<Arc<ChunkCallback>>,
}

impl fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferConfig")
            .field("concurrency", &self.concurrency)
            .field("chunk_size", &self.chunk_size)
            .field("initial_chunk_size", &self.initial_chunk_size)
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field("validate_content", &self.validate_content)
            .field("stream_options", &self.stream_options)
            .field("on_chunk_complete", &self.on_chunk_complete.is_some())
            .finish()
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            chunk_size: None,
            initial_chunk_size: DEFAULT_INITIAL_CHUNK_SIZE,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            validate_content: false,
            stream_options: ReliableStreamOptions::default(),
            on_chunk_complete: None,
        }
    }
}
