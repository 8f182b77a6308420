//! Linear backoff on upstream throttling.
//!
//! Used by adapters whose source answers "too many requests" under load.
//! Only [`RetryClass::Backoff`] failures are retried; everything else
//! propagates after the first attempt.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::{MarketDataError, RetryClass};
use crate::metrics::{Outcome, ProviderMetrics};
use crate::models::{FetchContext, ProviderId};

/// Where the retry loop stands after an attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryState {
    /// An attempt is about to run (or running).
    Attempting,
    /// Throttled; waiting before the next attempt.
    BackingOff,
    /// Throttled on the last allowed attempt.
    Exhausted,
    /// The attempt returned a value.
    Succeeded,
}

/// Rate-limit retry settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitRetry {
    /// Total attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Delay unit; attempt `n` is followed by a wait of `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RateLimitRetry {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: Self::DEFAULT_BASE_DELAY,
        }
    }
}

impl RateLimitRetry {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2_000);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the given (1-based) attempt. Linear, not exponential.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// State transition after `attempt` finished with `result`.
    pub fn next_state<T>(&self, attempt: u32, result: &Result<T, MarketDataError>) -> RetryState {
        match result {
            Ok(_) => RetryState::Succeeded,
            Err(e) if e.retry_class() == RetryClass::Backoff => {
                if attempt >= self.max_attempts {
                    RetryState::Exhausted
                } else {
                    RetryState::BackingOff
                }
            }
            // Non-throttling failures leave the loop as they are.
            Err(_) => RetryState::Exhausted,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-throttling error,
    /// or runs out of attempts.
    ///
    /// The closure receives the 1-based attempt number. Each attempt is
    /// recorded as one `market.provider.attempts` observation. Cancelling
    /// `ctx` during a backoff wait ends the loop with
    /// [`MarketDataError::Interrupted`].
    pub async fn run<T, F, Fut>(
        &self,
        provider: &ProviderId,
        symbol: &str,
        ctx: &FetchContext,
        metrics: &ProviderMetrics,
        mut operation: F,
    ) -> Result<T, MarketDataError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let result = operation(attempt).await;
            metrics.record_attempt(provider, symbol, Outcome::of(&result), started.elapsed());

            match (self.next_state(attempt, &result), result) {
                (RetryState::Succeeded, Ok(value)) => return Ok(value),
                (RetryState::BackingOff, Err(_)) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        provider = %provider,
                        symbol,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = ctx.cancel.cancelled() => {
                            return Err(MarketDataError::Interrupted {
                                provider: provider.clone(),
                                symbol: symbol.to_string(),
                            });
                        }
                    }
                    attempt += 1;
                    debug!(provider = %provider, symbol, attempt, "retrying");
                }
                (_, Err(e)) if e.retry_class() == RetryClass::Backoff => {
                    return Err(MarketDataError::RateLimitExceeded {
                        provider: provider.clone(),
                        symbol: symbol.to_string(),
                        attempts: attempt,
                    });
                }
                (_, result) => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{InMemoryMetricsSink, ATTEMPTS_METRIC};
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn yahoo() -> ProviderId {
        Cow::Borrowed("YAHOO_FINANCE")
    }

    fn throttled() -> MarketDataError {
        MarketDataError::RateLimited { provider: yahoo() }
    }

    fn recording() -> (Arc<InMemoryMetricsSink>, ProviderMetrics) {
        let sink = Arc::new(InMemoryMetricsSink::new());
        let metrics = ProviderMetrics::new(sink.clone());
        (sink, metrics)
    }

    #[test]
    fn test_linear_delay() {
        let retry = RateLimitRetry::default();
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(2_000));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(4_000));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(6_000));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RateLimitRetry::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_state_transitions() {
        let retry = RateLimitRetry::default();
        let ok: Result<(), MarketDataError> = Ok(());
        assert_eq!(retry.next_state(1, &ok), RetryState::Succeeded);
        assert_eq!(retry.next_state(1, &Err::<(), _>(throttled())), RetryState::BackingOff);
        assert_eq!(retry.next_state(3, &Err::<(), _>(throttled())), RetryState::Exhausted);
        assert_eq!(
            retry.next_state(1, &Err::<(), _>(MarketDataError::provider(&yahoo(), "HTTP 500"))),
            RetryState::Exhausted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_two_throttles() {
        let (sink, metrics) = recording();
        let calls = AtomicU32::new(0);
        let ctx = FetchContext::new();

        let started = tokio::time::Instant::now();
        let result = RateLimitRetry::default()
            .run(&yahoo(), "PETR4.SA", &ctx, &metrics, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt <= 2 {
                        Err(throttled())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s after the first attempt, 4s after the second
        assert!(started.elapsed() >= Duration::from_secs(6));

        let tags = [("provider", "YAHOO_FINANCE")];
        assert_eq!(sink.timer_count(ATTEMPTS_METRIC, &tags), 3);
        assert_eq!(
            sink.timer_count(ATTEMPTS_METRIC, &[("provider", "YAHOO_FINANCE"), ("status", "error")]),
            2
        );
        assert_eq!(
            sink.timer_count(ATTEMPTS_METRIC, &[("provider", "YAHOO_FINANCE"), ("status", "success")]),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_names_attempt_count() {
        let (_sink, metrics) = recording();
        let calls = AtomicU32::new(0);
        let ctx = FetchContext::new();

        let result: Result<(), _> = RateLimitRetry::default()
            .run(&yahoo(), "PETR4.SA", &ctx, &metrics, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(throttled()) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::RateLimitExceeded { attempts: 3, .. }
        ));
        assert_eq!(
            err.to_string(),
            "[YAHOO_FINANCE] Rate limit exceeded after 3 attempts for PETR4.SA"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_abort_immediately() {
        let (sink, metrics) = recording();
        let calls = AtomicU32::new(0);
        let ctx = FetchContext::new();

        let result: Result<(), _> = RateLimitRetry::default()
            .run(&yahoo(), "PETR4.SA", &ctx, &metrics, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MarketDataError::provider(&yahoo(), "Server error fetching PETR4.SA: HTTP 503")) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[YAHOO_FINANCE] Server error fetching PETR4.SA: HTTP 503"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.timer_count(ATTEMPTS_METRIC, &[("status", "error")]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_is_interrupted() {
        let (_sink, metrics) = recording();
        let ctx = FetchContext::new();
        let cancel = ctx.cancel.clone();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });

        let result: Result<(), _> = RateLimitRetry::default()
            .run(&yahoo(), "PETR4.SA", &ctx, &metrics, |_| async { Err(throttled()) })
            .await;

        canceller.await.unwrap();
        assert!(matches!(
            result,
            Err(MarketDataError::Interrupted { ref symbol, .. }) if symbol == "PETR4.SA"
        ));
    }
}
