//! The terminal policy.

use crate::context::Context;
use crate::error::Result;
use crate::http::{HttpTransport, Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Performs the network exchange; never delegates further.
///
/// The exchange is raced against the context so cancellation aborts
/// blocking I/O promptly.
#[derive(Clone)]
pub struct TransportPolicy {
    transport: Arc<dyn HttpTransport>,
}

impl TransportPolicy {
    /// Creates the policy around `transport`.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl fmt::Debug for TransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportPolicy").finish_non_exhaustive()
    }
}

#[async_trait]
impl Policy for TransportPolicy {
    async fn send(&self, ctx: &Context, request: Request, _next: Next<'_>) -> Result<Response> {
        let transport = Arc::clone(&self.transport);
        ctx.run(async move { transport.execute(request.into_reqwest()).await })
            .await
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        // The connection pool behind the transport is safe to share.
        self
    }
}
