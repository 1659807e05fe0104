//! Pipeline module containing the policy chain.
//!
//! This module provides the [`Policy`] capability, the [`Pipeline`] that
//! composes policies in construction order, the standard policies, and the
//! [`PipelineBuilder`] assembling them.
//!
//! # Overview
//!
//! - `policy` - The [`Policy`] trait and the [`Next`] continuation
//! - `pipeline` - The [`Pipeline`] itself
//! - [`policies`] - Telemetry, request id, retry, logging, authentication and transport
//! - `builder` - [`PipelineBuilder`] with the standard ordering
//!
//! # Examples
//!
//! ```rust,no_run
//! use blobflow::http::{create_http_client, HttpClientConfig, Request};
//! use blobflow::pipeline::PipelineBuilder;
//! use blobflow::Context;
//! use reqwest::{Method, Url};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let pipeline = PipelineBuilder::new(Arc::new(client)).build()?;
//!
//! let url = Url::parse("https://account.blob.example.com/container/blob")?;
//! let response = pipeline
//!     .send(&Context::new(), Request::new(Method::HEAD, url))
//!     .await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod pipeline;
pub mod policies;
pub mod policy;

pub use builder::PipelineBuilder;
pub use pipeline::Pipeline;
pub use policies::{
    AccessToken, BearerTokenPolicy, Host, LoggingPolicy, RequestIdPolicy, RetryOptions,
    RetryPolicy, TelemetryPolicy, TokenCredential, TransportPolicy, CLIENT_REQUEST_ID,
};
pub use policy::{Next, Policy};
