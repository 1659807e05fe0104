//! The ordered policy chain.

use super::policy::{Next, Policy};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Request, Response};

use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// An ordered, immutable chain of policies.
///
/// `policies[0]` wraps `policies[1]`, which wraps the next one, down to the
/// terminal transport policy. Once built, a pipeline can be shared across
/// concurrent operations without locking.
///
/// ```rust
/// use blobflow::pipeline::{Pipeline, Policy, TelemetryPolicy};
/// use std::sync::Arc;
///
/// let policies: Vec<Arc<dyn Policy>> = vec![Arc::new(TelemetryPolicy::new("test", "1.0"))];
/// let pipeline = Pipeline::new(policies).unwrap();
/// assert_eq!(pipeline.len(), 1);
///
/// assert!(Pipeline::new(Vec::new()).is_err());
/// ```
pub struct Pipeline {
    policies: Vec<Arc<dyn Policy>>,
}

impl Pipeline {
    /// Creates a pipeline from an ordered, non-empty policy list.
    pub fn new(policies: Vec<Arc<dyn Policy>>) -> Result<Self> {
        if policies.is_empty() {
            return Err(Error::InvalidArgument(
                "a pipeline needs at least one policy".into(),
            ));
        }
        Ok(Self { policies })
    }

    /// Creates a pipeline by taking every policy out of `policies`.
    ///
    /// The caller's list is left empty, so later changes to it cannot affect
    /// the pipeline. An empty list is rejected and left untouched.
    pub fn take(policies: &mut Vec<Arc<dyn Policy>>) -> Result<Self> {
        if policies.is_empty() {
            return Err(Error::InvalidArgument(
                "a pipeline needs at least one policy".into(),
            ));
        }
        Self::new(std::mem::take(policies))
    }

    /// Number of policies in the chain.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Always false: a pipeline holds at least one policy.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies in application order.
    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    /// Sends `request` through the whole chain.
    pub async fn send(&self, ctx: &Context, request: Request) -> Result<Response> {
        trace!(
            method = %request.method(),
            url = %request.url(),
            policies = self.policies.len(),
            "Sending request through pipeline"
        );
        Next::new(&self.policies).run(ctx, request).await
    }
}

impl Clone for Pipeline {
    /// Duplicates every policy: stateless ones are shared, stateful ones copied.
    fn clone(&self) -> Self {
        Self {
            policies: self
                .policies
                .iter()
                .map(|policy| Arc::clone(policy).duplicate())
                .collect(),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("policies", &self.policies)
            .finish()
    }
}
