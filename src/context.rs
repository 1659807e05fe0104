//! Cancellation and deadline propagation.
//!
//! A [`Context`] is threaded explicitly through every suspension point of the
//! transport core: the transport exchange, the retry backoff wait, the stream
//! resume call and every concurrent chunk operation. Cancelling a context
//! cancels all of its children.
//!
//! # Examples
//!
//! ```rust
//! use blobflow::Context;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ctx = Context::new().with_timeout(Duration::from_secs(30));
//! let child = ctx.child();
//!
//! ctx.cancel();
//! assert!(child.is_cancelled());
//! # }
//! ```

use crate::error::{Error, Result};

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline shared by one logical operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a root context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child context, cancelled whenever this one is.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Creates a child context expiring after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Creates a child context expiring at `deadline`, or at the parent's
    /// deadline if that one comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Gets the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Fails with the matching cancellation error if the context is done.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Races `future` against cancellation and the deadline.
    ///
    /// The future is dropped as soon as the context is done, which aborts any
    /// blocking network I/O it was waiting on.
    pub async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            _ = expired => Err(Error::DeadlineExceeded),
            result = future => result,
        }
    }

    /// Waits for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_child_is_cancelled_with_parent() {
        let parent = Context::new();
        let child = parent.child();
        assert!(!child.is_cancelled());

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelling_child_leaves_parent_alone() {
        let parent = Context::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_deadline_never_extends_parent() {
        let parent = Context::new().with_timeout(Duration::from_millis(50));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_sleep_is_interrupted_by_cancel() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let result = ctx.sleep(Duration::from_secs(30)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_reports_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(10));
        let result: Result<()> = ctx
            .run(async {
                sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = Context::new();
        let value = ctx.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
