//! Bounded retry with exponential backoff for console queries.
//!
//! A failed query is retried a fixed number of times with growing delays
//! before the failure is reported to the fetch state. The wait between
//! attempts respects a [`CancellationToken`]: once a newer request supersedes
//! this one, no further attempts are made and the last error is returned
//! (where it is discarded as stale anyway).

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Errors that know whether another attempt could succeed.
pub trait RetryableError: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

/// Run `operation` until it succeeds, fails with a non-retryable error, runs
/// out of attempts, or `cancel` fires during a backoff wait.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Query failed, retrying",
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(attempt, "Retry abandoned, request superseded");
                return Err(err);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, policy);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Flaky {
        retryable: bool,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(retryable={})", self.retryable)
        }
    }

    impl RetryableError for Flaky {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn next_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(
            next_delay(Duration::from_millis(250), &policy),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(
            next_delay(Duration::from_millis(800), &policy),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [250, 500, 1000, 2000, 4000, 5000, 5000];

        for &expected_ms in &expected {
            assert_eq!(delay.as_millis() as u64, expected_ms);
            delay = next_delay(delay, &policy);
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = retry_with_backoff(&fast_policy(3), &cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Flaky { retryable: true })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), Flaky> = retry_with_backoff(&fast_policy(2), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { retryable: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), Flaky> = retry_with_backoff(&fast_policy(5), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { retryable: false }) }
        })
        .await;

        assert_eq!(result, Err(Flaky { retryable: false }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_further_attempts() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), Flaky> = retry_with_backoff(&fast_policy(5), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { retryable: true }) }
        })
        .await;

        assert!(result.is_err());
        // The first attempt always runs; cancellation only cuts the waits.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let _: Result<(), Flaky> = retry_with_backoff(&RetryPolicy::none(), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { retryable: true }) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
