//! Retry with exponential back-off and jitter for completion calls.
//!
//! Every failure is retried: transport errors, rate limits, 5xx and responses
//! that do not have the expected shape. The attempt budget is the only stop.

use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay after failed attempt `attempt` (1-based):
    /// `base × 2^(attempt−1)`, capped at 60 s.
    #[must_use]
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(10);
        self.backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(MAX_DELAY_MS)
    }

    /// Delay with ±25 % jitter applied.
    #[must_use]
    pub fn jittered_delay_ms(&self, attempt: u32) -> u64 {
        let capped = self.backoff_delay_ms(attempt);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        delay_ms
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` calls have failed.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay_ms = policy.jittered_delay_ms(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "completion call failed, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn no_wait(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_base_ms: 0,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay_ms(1), 1_000);
        assert_eq!(policy.backoff_delay_ms(2), 2_000);
        assert_eq!(policy.backoff_delay_ms(3), 4_000);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 20,
            backoff_base_ms: 10_000,
        };
        assert_eq!(policy.backoff_delay_ms(15), 60_000);
    }

    #[test]
    fn jittered_delays_strictly_increase() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let first = policy.jittered_delay_ms(1);
            let second = policy.jittered_delay_ms(2);
            assert!((750..=1_250).contains(&first), "{first}");
            assert!(second > first, "{second} <= {first}");
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(no_wait(3), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, LlmError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_malformed_response_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(no_wait(3), || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(LlmError::MalformedResponse("no text block".to_owned()))
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_with_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(no_wait(3), || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<u32, _>(LlmError::MalformedResponse(format!("attempt {attempt}")))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "at most three calls");
        assert!(matches!(result, Err(LlmError::MalformedResponse(ref m)) if m == "attempt 3"));
    }

    #[tokio::test]
    async fn zero_attempts_still_calls_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let _ = retry_with_backoff(no_wait(0), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(LlmError::MissingApiKey)
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
