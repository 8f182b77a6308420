//! In-memory metrics sink.
//!
//! Keeps every observation so tests and diagnostics can query them by
//! metric name and tag subset.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{MetricsSink, Tag};

/// One recorded timer observation.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerObservation {
    pub name: &'static str,
    pub tags: Vec<(&'static str, String)>,
    pub duration: Duration,
}

/// One recorded counter increment.
#[derive(Clone, Debug, PartialEq)]
pub struct CounterIncrement {
    pub name: &'static str,
    pub tags: Vec<(&'static str, String)>,
}

#[derive(Debug, Default)]
struct Recorded {
    timers: Vec<TimerObservation>,
    counters: Vec<CounterIncrement>,
}

/// Sink that records everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    recorded: Mutex<Recorded>,
}

fn owned_tags(tags: &[Tag<'_>]) -> Vec<(&'static str, String)> {
    tags.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
}

fn matches(recorded: &[(&'static str, String)], filter: &[Tag<'_>]) -> bool {
    filter
        .iter()
        .all(|(key, value)| recorded.iter().any(|(k, v)| k == key && v == value))
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // A panic while holding the lock leaves the data intact; keep going.
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All timer observations, in recording order.
    pub fn timers(&self) -> Vec<TimerObservation> {
        self.lock().timers.clone()
    }

    /// All counter increments, in recording order.
    pub fn counters(&self) -> Vec<CounterIncrement> {
        self.lock().counters.clone()
    }

    /// Number of observations of `name` whose tags include every `filter` pair.
    pub fn timer_count(&self, name: &str, filter: &[Tag<'_>]) -> usize {
        self.lock()
            .timers
            .iter()
            .filter(|t| t.name == name && matches(&t.tags, filter))
            .count()
    }

    /// Sum of increments of `name` whose tags include every `filter` pair.
    pub fn counter_value(&self, name: &str, filter: &[Tag<'_>]) -> u64 {
        self.lock()
            .counters
            .iter()
            .filter(|c| c.name == name && matches(&c.tags, filter))
            .count() as u64
    }

    pub fn clear(&self) {
        let mut recorded = self.lock();
        recorded.timers.clear();
        recorded.counters.clear();
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn record_timer(&self, name: &'static str, tags: &[Tag<'_>], duration: Duration) {
        self.lock().timers.push(TimerObservation {
            name,
            tags: owned_tags(tags),
            duration,
        });
    }

    fn increment_counter(&self, name: &'static str, tags: &[Tag<'_>]) {
        self.lock().counters.push(CounterIncrement {
            name,
            tags: owned_tags(tags),
        });
    }
}
