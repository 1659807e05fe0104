//! Self-healing response bodies.
//!
//! [`ReliableStream`] wraps a streamed response body together with a
//! [`Resume`] function able to re-request the remainder of the resource.
//! A transient read failure is absorbed by resuming at the current offset,
//! provided the resource version is unchanged.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::stream::{ReliableStream, ReliableStreamOptions, ResumedBody};
//! use blobflow::{Context, Error};
//! use bytes::Bytes;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() -> blobflow::Result<()> {
//! let body = stream::iter(vec![Ok(Bytes::from_static(b"hello "))]).boxed();
//! let resume = |_ctx: Context, offset: u64| async move {
//!     assert_eq!(offset, 6);
//!     Ok::<_, Error>(ResumedBody {
//!         body: stream::iter(vec![Ok(Bytes::from_static(b"world"))]).boxed(),
//!         version: None,
//!     })
//! };
//!
//! let mut reliable = ReliableStream::new(
//!     &Context::new(),
//!     body,
//!     None,
//!     Some(11),
//!     ReliableStreamOptions::default(),
//!     resume,
//! );
//! assert_eq!(reliable.read_to_end().await?, b"hello world");
//! # Ok(())
//! # }
//! ```

pub mod reliable;

pub use reliable::{BodyStream, ReliableStream, ReliableStreamOptions, Resume, ResumedBody};
