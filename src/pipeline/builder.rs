//! Standard pipeline assembly.

use super::policies::{
    BearerTokenPolicy, LoggingPolicy, RequestIdPolicy, RetryOptions, RetryPolicy, TelemetryPolicy,
    TokenCredential, TransportPolicy,
};
use super::{Pipeline, Policy};
use crate::error::Result;
use crate::http::HttpTransport;

use std::sync::Arc;

/// A builder used to create a [`Pipeline`] with the standard policy order.
///
/// ```rust
/// use blobflow::http::{create_http_client, HttpClientConfig};
/// use blobflow::pipeline::{PipelineBuilder, RetryOptions};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = create_http_client(HttpClientConfig::default())?;
/// let pipeline = PipelineBuilder::new(Arc::new(client))
///     .telemetry("storage-blobs", "1.0.0")
///     .retry(RetryOptions { max_retries: 5, ..RetryOptions::default() })
///     .build()?;
/// assert_eq!(pipeline.len(), 5);
/// # Ok(())
/// # }
/// ```
pub struct PipelineBuilder {
    transport: Arc<dyn HttpTransport>,
    telemetry: Option<(String, String)>,
    retry: RetryOptions,
    per_call: Vec<Arc<dyn Policy>>,
    per_retry: Vec<Arc<dyn Policy>>,
    credential: Option<(Arc<dyn TokenCredential>, Vec<String>)>,
    logging: bool,
}

impl PipelineBuilder {
    /// Creates a builder terminating in `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            telemetry: None,
            retry: RetryOptions::default(),
            per_call: Vec::new(),
            per_retry: Vec::new(),
            credential: None,
            logging: true,
        }
    }

    /// Identify the calling component in the `User-Agent` header.
    pub fn telemetry(mut self, component: &str, version: &str) -> Self {
        self.telemetry = Some((component.to_string(), version.to_string()));
        self
    }

    /// Set the retry options.
    pub fn retry(mut self, options: RetryOptions) -> Self {
        self.retry = options;
        self
    }

    /// Add a policy that runs once per operation, before retries.
    pub fn per_call(mut self, policy: Arc<dyn Policy>) -> Self {
        self.per_call.push(policy);
        self
    }

    /// Add a policy that runs on every attempt, after the retry policy.
    pub fn per_retry(mut self, policy: Arc<dyn Policy>) -> Self {
        self.per_retry.push(policy);
        self
    }

    /// Authenticate requests with bearer tokens for `scopes`.
    pub fn credential(mut self, credential: Arc<dyn TokenCredential>, scopes: Vec<String>) -> Self {
        self.credential = Some((credential, scopes));
        self
    }

    /// Set whether each attempt is logged.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        let mut policies: Vec<Arc<dyn Policy>> = Vec::new();
        if let Some((component, version)) = &self.telemetry {
            policies.push(Arc::new(TelemetryPolicy::new(component, version)));
        }
        policies.push(Arc::new(RequestIdPolicy::new()));
        policies.extend(self.per_call);
        policies.push(Arc::new(RetryPolicy::new(self.retry)));
        policies.extend(self.per_retry);
        if self.logging {
            policies.push(Arc::new(LoggingPolicy::new()));
        }
        if let Some((credential, scopes)) = self.credential {
            policies.push(Arc::new(BearerTokenPolicy::new(credential, scopes)));
        }
        policies.push(Arc::new(TransportPolicy::new(self.transport)));
        Pipeline::take(&mut policies)
    }
}
