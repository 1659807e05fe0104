//! `User-Agent` telemetry.

use crate::context::Context;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use std::sync::Arc;

/// Identifies the calling component in the `User-Agent` header.
#[derive(Debug, Clone)]
pub struct TelemetryPolicy {
    user_agent: HeaderValue,
}

impl TelemetryPolicy {
    /// Creates the policy for `component` at `version`.
    ///
    /// Characters that are not valid in a header value are dropped.
    pub fn new(component: &str, version: &str) -> Self {
        let raw = format!(
            "{}/{} blobflow/{} ({}; {})",
            component,
            version,
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        let sanitized: String = raw.chars().filter(|c| (' '..='~').contains(c)).collect();
        let user_agent = HeaderValue::from_str(&sanitized)
            .unwrap_or_else(|_| HeaderValue::from_static("blobflow"));
        Self { user_agent }
    }

    /// Gets the header value sent with every request.
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }
}

#[async_trait]
impl Policy for TelemetryPolicy {
    async fn send(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> Result<Response> {
        request.insert_header(USER_AGENT, self.user_agent.clone());
        next.run(ctx, request).await
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        self
    }
}
