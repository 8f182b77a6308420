//! Provider call instrumentation.
//!
//! Metrics are recorded through an injected [`MetricsSink`] rather than a
//! global registry, so the registry, the adapters and tests all share the
//! same explicit dependency.
//!
//! Recorded series:
//!
//! | Name | Type | Tags |
//! |------|------|------|
//! | `market.provider.latency` | timer | provider, symbol, status |
//! | `market.provider.errors` | counter | provider, symbol |
//! | `market.provider.attempts` | timer | provider, symbol, status |

mod memory;
#[cfg(feature = "prometheus")]
mod prometheus;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

pub use memory::{CounterIncrement, InMemoryMetricsSink, TimerObservation};
#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusMetricsSink;

/// Timer for a whole provider call, as seen by the registry.
pub const LATENCY_METRIC: &str = "market.provider.latency";

/// Counter of failed provider calls.
pub const ERRORS_METRIC: &str = "market.provider.errors";

/// Timer for each physical attempt inside a provider's retry loop.
pub const ATTEMPTS_METRIC: &str = "market.provider.attempts";

/// A metric tag: static key, runtime value.
pub type Tag<'a> = (&'static str, &'a str);

/// Outcome tag value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub(crate) fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Self::Success
        } else {
            Self::Error
        }
    }
}

/// Destination for timer observations and counter increments.
pub trait MetricsSink: Send + Sync {
    fn record_timer(&self, name: &'static str, tags: &[Tag<'_>], duration: Duration);

    fn increment_counter(&self, name: &'static str, tags: &[Tag<'_>]);
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_timer(&self, _name: &'static str, _tags: &[Tag<'_>], _duration: Duration) {}

    fn increment_counter(&self, _name: &'static str, _tags: &[Tag<'_>]) {}
}

/// Sink that emits every observation as a `tracing` debug event.
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_timer(&self, name: &'static str, tags: &[Tag<'_>], duration: Duration) {
        debug!(
            metric = name,
            tags = ?tags,
            elapsed_ms = duration.as_millis() as u64,
            "timer"
        );
    }

    fn increment_counter(&self, name: &'static str, tags: &[Tag<'_>]) {
        debug!(metric = name, tags = ?tags, "counter");
    }
}

/// Latency and error instrumentation for provider calls.
///
/// Purely a side channel: the wrapped result is handed back untouched.
#[derive(Clone)]
pub struct ProviderMetrics {
    sink: Arc<dyn MetricsSink>,
}

impl ProviderMetrics {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Instrumentation that records nothing.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopMetricsSink))
    }

    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    /// Run `operation`, recording one latency observation tagged with the
    /// outcome and, on failure, one error count. The result is returned
    /// unchanged.
    pub async fn record_latency<T, E, F>(&self, provider: &str, symbol: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = operation.await;
        let elapsed = started.elapsed();

        let outcome = Outcome::of(&result);
        self.sink.record_timer(
            LATENCY_METRIC,
            &[
                ("provider", provider),
                ("symbol", symbol),
                ("status", outcome.as_str()),
            ],
            elapsed,
        );
        if outcome == Outcome::Error {
            self.sink.increment_counter(
                ERRORS_METRIC,
                &[("provider", provider), ("symbol", symbol)],
            );
        }

        result
    }

    /// Record one physical attempt of a retried call.
    pub fn record_attempt(&self, provider: &str, symbol: &str, outcome: Outcome, elapsed: Duration) {
        self.sink.record_timer(
            ATTEMPTS_METRIC,
            &[
                ("provider", provider),
                ("symbol", symbol),
                ("status", outcome.as_str()),
            ],
            elapsed,
        );
    }
}

impl Default for ProviderMetrics {
    fn default() -> Self {
        Self::new(Arc::new(TracingMetricsSink))
    }
}

impl std::fmt::Debug for ProviderMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderMetrics").finish_non_exhaustive()
    }
}
