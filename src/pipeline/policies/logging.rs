//! Structured logging of pipeline exchanges.

use crate::context::Context;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Logs method, url, status and latency of every exchange below it.
///
/// Placed after the retry policy, it logs each attempt separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPolicy;

impl LoggingPolicy {
    /// Creates the policy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Policy for LoggingPolicy {
    async fn send(&self, ctx: &Context, request: Request, next: Next<'_>) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let started = Instant::now();
        debug!(%method, %url, "Sending request");

        let outcome = next.run(ctx, request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), elapsed_ms, "Received response")
            }
            Err(e) => warn!(%method, %url, error = %e, elapsed_ms, "Request failed"),
        }
        outcome
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        self
    }
}
