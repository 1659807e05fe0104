//! HTTP module containing the request model and client functionality.
//!
//! This module provides the [`Request`] and [`Body`] types that flow through
//! the [`Pipeline`](crate::pipeline::Pipeline), the [`HttpTransport`]
//! abstraction used by the terminal transport policy, and the reqwest client
//! setup backing it.
//!
//! # Overview
//!
//! - [`client`] - HTTP client creation, middleware configuration and transports
//! - [`request`] - Requests and replayable request bodies
//!
//! # Examples
//!
//! ## Creating an HTTP Client
//!
//! ```rust
//! use blobflow::http::{create_http_client, HttpClientConfig};
//! use reqwest::header::{HeaderMap, USER_AGENT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "MyApp/1.0".parse()?);
//!
//! let config = HttpClientConfig {
//!     headers: Some(headers),
//!     ..HttpClientConfig::default()
//! };
//!
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Building a Request
//!
//! ```rust
//! use blobflow::http::{Body, Request};
//! use reqwest::{Method, Url};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://account.example.com/container/blob")?;
//! let request = Request::new(Method::PUT, url).with_body(Body::from("hello"));
//! assert_eq!(request.body().len(), Some(5));
//! assert!(request.try_clone().is_some());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod request;

pub use client::{create_http_client, HttpClientConfig, HttpTransport};
pub use request::{Body, Request};

/// Response produced by the pipeline; the body is streamed, not buffered.
pub type Response = reqwest::Response;
