//! Retry policy with capped exponential back-off and jitter.
//!
//! A [`RetryPolicy`] is a plain value handed to whoever runs the work, so the
//! runner, the resolver, and the tests can each pick their own schedule.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use spesa_core::AppConfig;

use crate::error::ScraperError;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    Fixed(Duration),
    /// `base × 2^(n-1)` before the n-th retry, optionally scaled by a random
    /// factor in `[0.75, 1.25)`, never more than `cap`.
    Exponential {
        base: Duration,
        cap: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Delay to wait after `failed_attempts` consecutive failures (1-based).
    #[must_use]
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, cap, jitter } => {
                let exponent = failed_attempts.saturating_sub(1).min(20);
                let computed = base.saturating_mul(1u32 << exponent).min(cap);
                if jitter {
                    computed
                        .mul_f64(rand::random::<f64>() * 0.5 + 0.75)
                        .min(cap)
                } else {
                    computed
                }
            }
        }
    }
}

/// How many times to try, how long to wait, and which errors are worth it.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    retryable: fn(&ScraperError) -> bool,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 1 s base, 30 s cap, with jitter; transient errors only.
    fn default() -> Self {
        Self::new(
            3,
            Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(30),
                jitter: true,
            },
        )
    }
}

impl RetryPolicy {
    /// Policy retrying [`ScraperError::is_transient`] errors. `max_attempts`
    /// counts the first try and is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: ScraperError::is_transient,
        }
    }

    /// Single attempt, no retry.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::None)
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.max_attempts,
            Backoff::Exponential {
                base: Duration::from_millis(config.retry_backoff_base_ms),
                cap: Duration::from_millis(config.retry_backoff_cap_ms),
                jitter: true,
            },
        )
    }

    /// Replaces the retryable-error predicate.
    #[must_use]
    pub fn with_retryable(mut self, retryable: fn(&ScraperError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        self.backoff.delay(failed_attempts)
    }

    #[must_use]
    pub fn retryable(&self, err: &ScraperError) -> bool {
        (self.retryable)(err)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. Each attempt is bounded by `deadline` when
    /// given; an expired deadline is a [`ScraperError::Timeout`].
    ///
    /// Returns the final result together with the number of attempts made.
    pub async fn run<T, F, Fut>(
        &self,
        deadline: Option<Duration>,
        mut operation: F,
    ) -> (Result<T, ScraperError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = match deadline {
                Some(limit) => tokio::time::timeout(limit, operation())
                    .await
                    .unwrap_or_else(|_| {
                        Err(ScraperError::Timeout {
                            operation: "task attempt".to_owned(),
                            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                None => operation().await,
            };

            let err = match result {
                Ok(value) => return (Ok(value), attempts),
                Err(err) => err,
            };
            if attempts >= self.max_attempts || !self.retryable(&err) {
                return (Err(err), attempts);
            }

            let delay = self.backoff(attempts);
            tracing::warn!(
                attempt = attempts,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient error, retrying after back-off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> ScraperError {
        ScraperError::UnexpectedStatus {
            status: 503,
            url: "https://example.test/facet".to_owned(),
        }
    }

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::None)
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let (result, attempts) = immediate(3)
            .run(None, || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, ScraperError>(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let (result, attempts) = immediate(3)
            .run(None, || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(server_error())
                    } else {
                        Ok::<u32, ScraperError>(99)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_max_attempts() {
        let (result, attempts) = immediate(2)
            .run(None, || async { Err::<u32, _>(server_error()) })
            .await;
        assert_eq!(attempts, 2);
        assert!(matches!(
            result,
            Err(ScraperError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_protocol_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let (result, attempts) = immediate(5)
            .run(None, || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(ScraperError::protocol("facet", "bad shape", None))
                }
            })
            .await;
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScraperError::UpstreamProtocol { .. })));
    }

    #[tokio::test]
    async fn custom_predicate_overrides_default() {
        let policy = immediate(4).with_retryable(|_| false);
        let (_, attempts) = policy
            .run(None, || async { Err::<u32, _>(server_error()) })
            .await;
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn expired_deadline_is_a_retryable_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let (result, attempts) = immediate(2)
            .run(Some(Duration::from_millis(10)), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<u32, ScraperError>(1)
                }
            })
            .await;
        assert_eq!(attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ScraperError::Timeout { .. })));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            cap: Duration::from_millis(350),
            jitter: false,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(350));
        assert_eq!(backoff.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_quarter_band() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(1000),
            cap: Duration::from_secs(30),
            jitter: true,
        };
        for _ in 0..100 {
            let d = backoff.delay(1);
            assert!(d >= Duration::from_millis(750) && d < Duration::from_millis(1250));
        }
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(400),
            cap: Duration::from_millis(500),
            jitter: true,
        };
        for attempt in 1..=4 {
            for _ in 0..100 {
                assert!(backoff.delay(attempt) <= Duration::from_millis(500));
            }
        }
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        assert_eq!(RetryPolicy::new(0, Backoff::None).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
