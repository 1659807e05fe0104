//! Bounded retry with exponential backoff and secondary-host failover.
//!
//! Every attempt is classified:
//!
//! 1. success or a non-retryable failure is returned as is;
//! 2. a transient failure (network error, 408, 429, 5xx by default) is
//!    retried unless the attempt budget or the elapsed-time ceiling is spent;
//! 3. before a retry the policy waits `min(max_delay, base_delay * 2^n)` with
//!    bounded jitter. The wait is cancellable through the context.
//!
//! Read-only requests (`GET`, `HEAD`) alternate between the primary host and
//! the configured secondary host. A `404` from the secondary is treated as
//! replication lag: the secondary is abandoned for the rest of the operation
//! and the request is retried against the primary.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::pipeline::{Next, Policy};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, RetryDecision, RetryPolicy as BackoffPolicy};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Retry configuration supplied by the caller.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles with every further retry.
    pub retry_delay: Duration,
    /// Upper bound of a single delay.
    pub max_retry_delay: Duration,
    /// Randomize delays between `retry_delay` and the exponential value.
    pub jitter: bool,
    /// Stop retrying once this much time has passed since the first attempt.
    pub max_elapsed: Option<Duration>,
    /// Response statuses worth retrying.
    pub status_codes: Vec<StatusCode>,
    /// Read-only requests alternate to this host on retries.
    pub secondary_host: Option<String>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(4),
            max_retry_delay: Duration::from_secs(120),
            jitter: true,
            max_elapsed: None,
            status_codes: vec![
                StatusCode::REQUEST_TIMEOUT,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
            secondary_host: None,
        }
    }
}

/// Host an attempt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// The host of the original request.
    Primary,
    /// The configured secondary host.
    Secondary,
}

/// Retry bookkeeping for one logical operation.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    host: Host,
    secondary_usable: bool,
    started: Instant,
    started_at: SystemTime,
}

impl RetryState {
    fn new(secondary_usable: bool) -> Self {
        Self {
            attempt: 0,
            host: Host::Primary,
            secondary_usable,
            started: Instant::now(),
            started_at: SystemTime::now(),
        }
    }

    fn next_host(&self) -> Host {
        match self.host {
            Host::Primary if self.secondary_usable => Host::Secondary,
            _ => Host::Primary,
        }
    }
}

enum Verdict {
    Done,
    Retry,
}

/// Retrying policy; see the module documentation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    options: RetryOptions,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    /// Creates the policy from `options`.
    pub fn new(options: RetryOptions) -> Self {
        let min = options.retry_delay;
        let max = options.max_retry_delay.max(min);
        let backoff = ExponentialBackoff::builder()
            .retry_bounds(min, max)
            .jitter(if options.jitter {
                Jitter::Bounded
            } else {
                Jitter::None
            })
            .build_with_max_retries(options.max_retries);
        Self { options, backoff }
    }

    /// Gets the options.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    fn classify(&self, outcome: &Result<Response>, state: &mut RetryState) -> Verdict {
        match outcome {
            Ok(response) => {
                let status = response.status();
                if state.host == Host::Secondary && status == StatusCode::NOT_FOUND {
                    debug!("Secondary host answered 404, falling back to primary");
                    state.secondary_usable = false;
                    Verdict::Retry
                } else if self.options.status_codes.contains(&status) {
                    Verdict::Retry
                } else {
                    Verdict::Done
                }
            }
            Err(e) if e.is_transient() => Verdict::Retry,
            Err(_) => Verdict::Done,
        }
    }

    /// Delay before the next attempt, or `None` when retries are spent.
    fn next_delay(&self, state: &RetryState) -> Option<Duration> {
        let delay = match self.backoff.should_retry(state.started_at, state.attempt) {
            RetryDecision::Retry { execute_after } => execute_after
                .duration_since(SystemTime::now())
                .unwrap_or_default()
                .min(self.options.max_retry_delay),
            RetryDecision::DoNotRetry => return None,
        };
        match self.options.max_elapsed {
            Some(ceiling) if state.started.elapsed() + delay > ceiling => None,
            _ => Some(delay),
        }
    }

    fn target(&self, request: &mut Request, host: Host) -> Result<()> {
        if let (Host::Secondary, Some(secondary)) = (host, &self.options.secondary_host) {
            request.url_mut().set_host(Some(secondary)).map_err(|e| {
                Error::InvalidUrl(format!("secondary host \"{}\" is invalid: {}", secondary, e))
            })?;
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

/// Wraps a transient failure that used up the retry budget.
fn exhausted(attempts: u32, error: Error) -> Error {
    if error.is_transient() {
        Error::OperationFailed {
            attempts,
            source: Box::new(error),
        }
    } else {
        error
    }
}

fn is_read_only(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[async_trait]
impl Policy for RetryPolicy {
    async fn send(&self, ctx: &Context, request: Request, next: Next<'_>) -> Result<Response> {
        if self.options.max_retries == 0 {
            // One attempt and no replay, so any body is accepted.
            return next.run(ctx, request).await.map_err(|e| exhausted(1, e));
        }
        if !request.body().is_replayable() {
            return Err(Error::InvalidArgument(
                "request body cannot be replayed, which retries require".into(),
            ));
        }

        let secondary_usable =
            self.options.secondary_host.is_some() && is_read_only(request.method());
        let mut state = RetryState::new(secondary_usable);

        loop {
            let mut attempt = request
                .try_clone()
                .ok_or_else(|| Error::Internal("replayable body could not be cloned".into()))?;
            self.target(&mut attempt, state.host)?;

            let outcome = next.run(ctx, attempt).await;
            if let Verdict::Done = self.classify(&outcome, &mut state) {
                return outcome;
            }

            let Some(delay) = self.next_delay(&state) else {
                let attempts = state.attempt + 1;
                warn!(attempts, "Retries exhausted");
                return outcome.map_err(|e| exhausted(attempts, e));
            };

            match &outcome {
                Ok(response) => debug!(
                    attempt = state.attempt,
                    status = %response.status(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after response"
                ),
                Err(e) => debug!(
                    attempt = state.attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after error"
                ),
            }
            drop(outcome);

            ctx.sleep(delay).await?;
            state.attempt += 1;
            state.host = state.next_host();
        }
    }

    fn duplicate(self: Arc<Self>) -> Arc<dyn Policy> {
        Arc::new(self.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_options(max_retries: u32) -> RetryOptions {
        RetryOptions {
            max_retries,
            retry_delay: Duration::from_millis(1),
            max_retry_delay: Duration::from_millis(8),
            jitter: false,
            ..RetryOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = RetryOptions::default();
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay, Duration::from_secs(4));
        assert!(options.status_codes.contains(&StatusCode::SERVICE_UNAVAILABLE));
        assert!(!options.status_codes.contains(&StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_delays_are_capped() {
        let policy = RetryPolicy::new(quick_options(10));
        let mut state = RetryState::new(false);
        for attempt in 0..10 {
            state.attempt = attempt;
            let delay = policy.next_delay(&state).unwrap();
            assert!(delay <= Duration::from_millis(8), "attempt {}: {:?}", attempt, delay);
        }
        state.attempt = 10;
        assert!(policy.next_delay(&state).is_none());
    }

    #[test]
    fn test_elapsed_ceiling_stops_retries() {
        let options = RetryOptions {
            max_elapsed: Some(Duration::ZERO),
            ..quick_options(5)
        };
        let policy = RetryPolicy::new(options);
        let state = RetryState::new(false);
        assert!(policy.next_delay(&state).is_none());
    }

    #[test]
    fn test_hosts_alternate_only_when_secondary_usable() {
        let mut state = RetryState::new(true);
        assert_eq!(state.next_host(), Host::Secondary);
        state.host = Host::Secondary;
        assert_eq!(state.next_host(), Host::Primary);

        state.host = Host::Primary;
        state.secondary_usable = false;
        assert_eq!(state.next_host(), Host::Primary);
    }

    #[test]
    fn test_only_transient_failures_are_wrapped() {
        let reset = Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(matches!(
            exhausted(1, reset),
            Error::OperationFailed { attempts: 1, .. }
        ));
        assert!(matches!(exhausted(1, Error::Cancelled), Error::Cancelled));
    }

    #[test]
    fn test_read_only_methods() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::HEAD));
        assert!(!is_read_only(&Method::PUT));
    }
}
