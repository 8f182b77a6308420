//! Prometheus-backed metrics sink (feature `prometheus`).
//!
//! Timers become histograms (seconds) and counters become integer counters.
//! A metric's label set is fixed by the first observation recorded for it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::warn;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use super::{MetricsSink, Tag};

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0];

/// Prometheus metric names use underscores.
fn prom_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Sink that feeds a `prometheus::Registry`.
pub struct PrometheusMetricsSink {
    registry: Registry,
    histograms: Mutex<HashMap<&'static str, HistogramVec>>,
    counters: Mutex<HashMap<&'static str, IntCounterVec>>,
}

impl PrometheusMetricsSink {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            histograms: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn histogram(&self, name: &'static str, tags: &[Tag<'_>]) -> Option<HistogramVec> {
        let mut histograms = self.histograms.lock().ok()?;
        if let Some(existing) = histograms.get(name) {
            return Some(existing.clone());
        }
        let labels: Vec<&str> = tags.iter().map(|(k, _)| *k).collect();
        let opts = HistogramOpts::new(prom_name(name), format!("{} (seconds)", name))
            .buckets(LATENCY_BUCKETS.to_vec());
        let histogram = HistogramVec::new(opts, &labels)
            .map_err(|e| warn!("Failed to create histogram {}: {}", name, e))
            .ok()?;
        if let Err(e) = self.registry.register(Box::new(histogram.clone())) {
            warn!("Failed to register histogram {}: {}", name, e);
        }
        histograms.insert(name, histogram.clone());
        Some(histogram)
    }

    fn counter(&self, name: &'static str, tags: &[Tag<'_>]) -> Option<IntCounterVec> {
        let mut counters = self.counters.lock().ok()?;
        if let Some(existing) = counters.get(name) {
            return Some(existing.clone());
        }
        let labels: Vec<&str> = tags.iter().map(|(k, _)| *k).collect();
        let counter = IntCounterVec::new(Opts::new(prom_name(name), name.to_string()), &labels)
            .map_err(|e| warn!("Failed to create counter {}: {}", name, e))
            .ok()?;
        if let Err(e) = self.registry.register(Box::new(counter.clone())) {
            warn!("Failed to register counter {}: {}", name, e);
        }
        counters.insert(name, counter.clone());
        Some(counter)
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn record_timer(&self, name: &'static str, tags: &[Tag<'_>], duration: Duration) {
        let Some(histogram) = self.histogram(name, tags) else {
            return;
        };
        let values: Vec<&str> = tags.iter().map(|(_, v)| *v).collect();
        match histogram.get_metric_with_label_values(&values) {
            Ok(h) => h.observe(duration.as_secs_f64()),
            Err(e) => warn!("Dropping observation for {}: {}", name, e),
        }
    }

    fn increment_counter(&self, name: &'static str, tags: &[Tag<'_>]) {
        let Some(counter) = self.counter(name, tags) else {
            return;
        };
        let values: Vec<&str> = tags.iter().map(|(_, v)| *v).collect();
        match counter.get_metric_with_label_values(&values) {
            Ok(c) => c.inc(),
            Err(e) => warn!("Dropping increment for {}: {}", name, e),
        }
    }
}
