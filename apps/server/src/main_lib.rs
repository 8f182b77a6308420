use std::sync::Arc;

use crate::config::Config;
use quotewire_market_data::{ProviderMetrics, ProviderRegistry, ReqwestHttpClient};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    #[cfg(feature = "metrics")]
    pub prometheus: prometheus::Registry,
}

impl AppState {
    #[cfg(not(feature = "metrics"))]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    #[cfg(feature = "metrics")]
    pub fn new(registry: ProviderRegistry, prometheus: prometheus::Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            prometheus,
        }
    }
}

/// Install the global subscriber. `log` records from the market data crate
/// are forwarded to it.
pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    tracing::info!("Provider settings: {:?}", config.providers);

    let http = Arc::new(ReqwestHttpClient::new(&config.providers.http)?);

    #[cfg(feature = "metrics")]
    {
        let prometheus = prometheus::Registry::new();
        let sink = Arc::new(quotewire_market_data::metrics::PrometheusMetricsSink::new(
            prometheus.clone(),
        ));
        let registry =
            ProviderRegistry::from_settings(&config.providers, http, ProviderMetrics::new(sink));
        Ok(Arc::new(AppState::new(registry, prometheus)))
    }

    #[cfg(not(feature = "metrics"))]
    {
        let registry =
            ProviderRegistry::from_settings(&config.providers, http, ProviderMetrics::default());
        Ok(Arc::new(AppState::new(registry)))
    }
}
