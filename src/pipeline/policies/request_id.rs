//! Client request ids.

use crate::context::Context;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use reqwest::header::HeaderName;
use std::sync::Arc;
use uuid::Uuid;

/// Header carrying the client request id.
pub const CLIENT_REQUEST_ID: HeaderName = HeaderName::from_static("x-ms-client-request-id");

/// Tags each request with a random UUID-formatted id, unless the caller
/// already set one.
///
/// Placed before the retry policy, all attempts of one operation share an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdPolicy;

impl RequestIdPolicy {
    /// Creates the policy.
    pub fn new() -> Self {
        Self
    }
}

/// Generates a random version 4 UUID string.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl Policy for RequestIdPolicy {
    async fn send(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> Result<Response> {
        if !request.headers().contains_key(&CLIENT_REQUEST_ID) {
            request.insert_header_str(CLIENT_REQUEST_ID, &new_request_id())?;
        }
        next.run(ctx, request).await
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_shape() {
        let id = new_request_id();
        assert_eq!(id.len(), 36);
        let groups: Vec<&str> = id.split('-').collect();
        assert_eq!(groups.iter().map(|g| g.len()).collect::<Vec<_>>(), vec![8, 4, 4, 4, 12]);
        assert_eq!(Uuid::parse_str(&id).map(|u| u.get_version_num()).ok(), Some(4));
    }

    #[test]
    fn test_request_ids_differ() {
        assert_ne!(new_request_id(), new_request_id());
    }
}
