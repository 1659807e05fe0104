//! HTTP client setup and transports.
//!
//! This module provides the reqwest client backing the terminal
//! [`TransportPolicy`](crate::pipeline::TransportPolicy), and the
//! [`HttpTransport`] seam that lets callers plug any other exchange
//! implementation (an in-memory server in tests, for instance).
//!
//! Retries are not configured on the client: they belong to the pipeline's
//! [`RetryPolicy`](crate::pipeline::RetryPolicy), which knows about replayable
//! bodies, secondary hosts and cancellation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use blobflow::http::{create_http_client, HttpClientConfig};
//! use reqwest::Proxy;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig {
//!     proxy: Some(Proxy::http("http://proxy.example.com:8080")?),
//!     ..HttpClientConfig::default()
//! };
//!
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use super::Response;
use crate::error::Result;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Configuration for HTTP client setup.
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Timeout for establishing connections.
    pub connect_timeout: Option<Duration>,
}

/// Creates an HTTP client with middleware configuration.
///
/// This function sets up a reqwest client with:
/// - Tracing middleware for request/response logging
/// - Optional proxy support
/// - Optional default headers
/// - Optional connect timeout
///
/// # Example
///
/// ```rust
/// use blobflow::http::client::{create_http_client, HttpClientConfig};
///
/// let client = create_http_client(HttpClientConfig::default()).unwrap();
/// ```
pub fn create_http_client(
    config: HttpClientConfig,
) -> std::result::Result<ClientWithMiddleware, reqwest::Error> {
    let mut inner_client_builder = reqwest::Client::builder();

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    if let Some(timeout) = config.connect_timeout {
        inner_client_builder = inner_client_builder.connect_timeout(timeout);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}

/// Performs the actual network exchange for one request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the response with its body unread.
    async fn execute(&self, request: reqwest::Request) -> Result<Response>;
}

#[async_trait]
impl HttpTransport for ClientWithMiddleware {
    async fn execute(&self, request: reqwest::Request) -> Result<Response> {
        Ok(ClientWithMiddleware::execute(self, request).await?)
    }
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<Response> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, USER_AGENT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert!(config.connect_timeout.is_none());
    }

    #[test]
    fn test_create_http_client_default() {
        let client = create_http_client(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            headers: Some(headers),
            connect_timeout: Some(Duration::from_secs(5)),
            ..HttpClientConfig::default()
        };

        let client = create_http_client(config);
        assert!(client.is_ok());
    }
}
