//! Bounded retry for boundary operations owned by the invoking job.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retries(self.attempts, self.delay, op).await
    }
}

/// Runs `op` up to `attempts` times, sleeping `delay` between tries.
///
/// Only errors for which [`Error::is_retryable`](crate::error::Error::is_retryable)
/// holds are retried; the last error is returned once attempts run out.
pub async fn with_retries<T, F, Fut>(attempts: usize, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                warn!(attempt, attempts, error = %e, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = &AtomicUsize::new(0);
        let result = with_retries(3, Duration::ZERO, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::FeedUnavailable { status: 503 })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = &AtomicUsize::new(0);
        let result: Result<()> = with_retries(3, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("timeout".into()))
        })
        .await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = &AtomicUsize::new(0);
        let result: Result<()> = with_retries(3, Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Decode("bad".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
