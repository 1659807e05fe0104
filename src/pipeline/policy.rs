//! The policy capability and its delegation chain.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Request, Response};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// A composable request/response interceptor.
///
/// A policy may inspect or mutate the request, delegate to the rest of the
/// chain through `next` zero or more times, and inspect or mutate the
/// response on its way back. The terminal policy produces the response
/// without delegating.
///
/// Policies are shared by every operation running on a pipeline, so any
/// per-call value must come from the request or the context.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use blobflow::pipeline::{Next, Policy};
/// use blobflow::{Context, Request, Response, Result};
/// use reqwest::header::HeaderValue;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct ApiVersionPolicy;
///
/// #[async_trait]
/// impl Policy for ApiVersionPolicy {
///     async fn send(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> Result<Response> {
///         request.insert_header("x-ms-version", HeaderValue::from_static("2020-02-10"));
///         next.run(ctx, request).await
///     }
///
///     fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
///         self
///     }
/// }
/// ```
#[async_trait]
pub trait Policy: Debug + Send + Sync + 'static {
    /// Processes `request`, delegating to `next` as needed.
    async fn send(&self, ctx: &Context, request: Request, next: Next<'_>) -> Result<Response>;

    /// Produces the instance used by a duplicated pipeline.
    ///
    /// Stateless policies return themselves; policies holding mutable state
    /// return an independent copy so no state is shared between pipelines.
    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy>;
}

/// Continuation bound to the policies after the current one.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn Policy>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(policies: &'a [Arc<dyn Policy>]) -> Self {
        Self { policies }
    }

    /// Number of policies left in the chain.
    pub fn remaining(&self) -> usize {
        self.policies.len()
    }

    /// Hands `request` to the next policy.
    ///
    /// Fails with [`Error::Cancelled`] or [`Error::DeadlineExceeded`] without
    /// invoking anything once the context is done.
    pub async fn run(self, ctx: &Context, request: Request) -> Result<Response> {
        ctx.check()?;
        match self.policies.split_first() {
            Some((policy, rest)) => policy.send(ctx, request, Next::new(rest)).await,
            None => Err(Error::Internal(
                "the pipeline ended without a policy producing a response".into(),
            )),
        }
    }
}

impl Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.policies.len())
            .finish()
    }
}
