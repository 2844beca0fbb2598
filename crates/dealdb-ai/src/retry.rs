//! Bounded retry with linear back-off for AI provider calls.
//!
//! A [`RetryPolicy`] is passed into each client rather than hard-wired, so
//! tests can run with a zero back-off and any other external call can reuse
//! the same schedule.

use std::future::Future;
use std::time::Duration;

use crate::error::AiError;

/// Returns `true` for rate limiting (HTTP 429) and transport failures.
///
/// Other non-2xx statuses, missing content and decode failures are returned
/// to the caller on the first attempt.
#[must_use]
pub fn is_transient(err: &AiError) -> bool {
    matches!(err, AiError::RateLimited | AiError::Http(_))
}

/// Attempt limit, back-off schedule and retry predicate for one call site.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    retry_if: fn(&AiError) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base", &self.backoff_base)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    /// Three attempts, sleeping `1000ms × attempt` between them.
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(1_000))
    }
}

impl RetryPolicy {
    /// Policy that sleeps `backoff_base × attempt` after each transient
    /// failure. `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn linear(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            retry_if: is_transient,
        }
    }

    /// Replaces the retry predicate.
    #[must_use]
    pub fn with_predicate(mut self, retry_if: fn(&AiError) -> bool) -> Self {
        self.retry_if = retry_if;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    /// Runs `operation` until it succeeds, fails with a non-retriable error,
    /// or the attempt limit is reached. The closure receives the 1-based
    /// attempt number.
    ///
    /// # Errors
    ///
    /// Returns the first non-retriable error, or the last error once all
    /// attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, AiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AiError>>,
    {
        let mut attempt = 1u32;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !(self.retry_if)(&err) || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "AI provider call failed, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn status(code: u16) -> AiError {
        AiError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn rate_limit_is_transient_other_statuses_are_not() {
        assert!(is_transient(&AiError::RateLimited));
        assert!(!is_transient(&status(500)));
        assert!(!is_transient(&status(400)));
        assert!(!is_transient(&AiError::MissingContent));
    }

    /// A loopback port with nothing listening on it.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn connection_failure_is_transient_and_retried_until_exhausted() {
        let url = format!("http://127.0.0.1:{}/chat/completions", closed_port());
        let client = reqwest::Client::new();
        let calls = AtomicU32::new(0);

        let result = RetryPolicy::linear(3, Duration::ZERO)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let request = client.post(&url);
                async move { request.send().await.map_err(AiError::from) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AiError::Http(_)), "got {err:?}");
        assert!(is_transient(&err));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_grows_linearly_with_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::linear(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn retries_rate_limits_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AiError::RateLimited)
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_error_returns_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status(500)) }
            })
            .await;

        assert!(matches!(result, Err(AiError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AiError::RateLimited) }
            })
            .await;

        assert!(matches!(result, Err(AiError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn custom_predicate_overrides_default() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(2, Duration::ZERO).with_predicate(|_| false);

        let _: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AiError::RateLimited) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
