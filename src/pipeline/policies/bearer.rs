//! Bearer token authentication.
//!
//! Credential formats are the caller's business: the policy only asks a
//! [`TokenCredential`] for a token and caches it until shortly before it
//! expires.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Tokens are refreshed this long before they expire.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(120);

/// An access token and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque token value.
    pub token: String,
    /// Moment the token stops being valid.
    pub expires_on: SystemTime,
}

impl AccessToken {
    fn is_fresh(&self, now: SystemTime) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_on
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of access tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Obtains a token valid for `scopes`.
    async fn get_token(&self, ctx: &Context, scopes: &[String]) -> Result<AccessToken>;
}

/// Sets `Authorization: Bearer <token>` on every request.
///
/// The token cache is per pipeline: a duplicated pipeline starts with an
/// empty cache and shares only the credential.
pub struct BearerTokenPolicy {
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
    cache: Mutex<Option<AccessToken>>,
}

impl BearerTokenPolicy {
    /// Creates the policy for `scopes`.
    pub fn new(credential: Arc<dyn TokenCredential>, scopes: Vec<String>) -> Self {
        Self {
            credential,
            scopes,
            cache: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<AccessToken> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache
            .as_ref()
            .filter(|token| token.is_fresh(SystemTime::now()))
            .cloned()
    }

    async fn token(&self, ctx: &Context) -> Result<AccessToken> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        debug!(scopes = ?self.scopes, "Requesting access token");
        let token = ctx
            .run(self.credential.get_token(ctx, &self.scopes))
            .await?;
        *self.cache.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.clone());
        Ok(token)
    }
}

impl fmt::Debug for BearerTokenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenPolicy")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Policy for BearerTokenPolicy {
    async fn send(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> Result<Response> {
        if request.url().scheme() != "https" {
            return Err(Error::InvalidArgument(
                "bearer tokens are only sent over https".into(),
            ));
        }
        let token = self.token(ctx).await?;
        request.insert_header_str(AUTHORIZATION, &format!("Bearer {}", token.token))?;
        next.run(ctx, request).await
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        Arc::new(Self::new(Arc::clone(&self.credential), self.scopes.clone()))
    }
}
