//! Provider registry for orchestrating market data providers.
//!
//! The registry owns the ordered provider list and runs the fallback chain:
//! - Provider selection by instrument class
//! - Ordered fallback to the next provider on failure
//! - Latency and error metrics per provider call
//! - Cooperative cancellation between and during calls
//!
//! The provider order is fixed at construction and never mutated, so a
//! registry can be shared across requests without locking.

use std::borrow::Cow;
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, error, info, warn};

use super::diagnostics::{FetchDiagnostics, SkipReason};
use super::settings::ProviderSettings;
use crate::errors::MarketDataError;
use crate::metrics::ProviderMetrics;
use crate::models::{Candle, FetchContext, InstrumentClass, PriceSnapshot, ProviderId, TimeRange};
use crate::provider::{
    AlphaVantageProvider, BrapiProvider, CoinGeckoProvider, HttpClient, MarketDataProvider,
    YahooProvider,
};

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    metrics: ProviderMetrics,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    ///
    /// Providers are ordered by ascending priority. The sort is stable, so
    /// providers with equal priority keep their registration order.
    pub fn new(mut providers: Vec<Arc<dyn MarketDataProvider>>, metrics: ProviderMetrics) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self { providers, metrics }
    }

    /// Build the default provider set.
    ///
    /// | Provider | Rank | Classes |
    /// |----------|------|---------|
    /// | Brapi (needs token) | 1 | STOCK, FII |
    /// | Yahoo Finance | 2 | STOCK, FII |
    /// | Alpha Vantage (needs API key) | 3 | STOCK |
    /// | CoinGecko | 1 | CRYPTO |
    pub fn from_settings(
        settings: &ProviderSettings,
        http: Arc<dyn HttpClient>,
        metrics: ProviderMetrics,
    ) -> Self {
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

        match settings.brapi_token() {
            Some(token) => providers.push(Arc::new(BrapiProvider::new(
                http.clone(),
                token,
                &settings.http,
            ))),
            None => warn!("Brapi token not configured, BRAPI provider disabled"),
        }

        providers.push(Arc::new(
            YahooProvider::new(http.clone(), &settings.http, metrics.clone())
                .with_retry(settings.yahoo_retry.clone()),
        ));

        match settings.alpha_vantage_api_key() {
            Some(key) => providers.push(Arc::new(AlphaVantageProvider::new(
                http.clone(),
                key,
                &settings.http,
            ))),
            None => warn!("Alpha Vantage API key not configured, ALPHA_VANTAGE provider disabled"),
        }

        providers.push(Arc::new(CoinGeckoProvider::new(http, &settings.http)));

        let registry = Self::new(providers, metrics);
        info!(
            "Provider registry initialized: {}",
            registry.provider_ids().join(", ")
        );
        registry
    }

    /// Get the list of registered providers, in fallback order.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    /// Ids of the registered providers, in fallback order.
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Providers serving `class`, in fallback order.
    pub fn eligible(&self, class: InstrumentClass) -> Vec<&Arc<dyn MarketDataProvider>> {
        self.providers.iter().filter(|p| p.supports(class)).collect()
    }

    /// Fetch the current price from the first provider that succeeds.
    pub async fn get_current_price(
        &self,
        class: InstrumentClass,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        self.get_current_price_with(&FetchContext::new(), class, symbol)
            .await
    }

    /// [`get_current_price`](Self::get_current_price) under a caller-owned
    /// context (cancellation, reference time).
    pub async fn get_current_price_with(
        &self,
        ctx: &FetchContext,
        class: InstrumentClass,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        self.fallback(ctx, class, symbol, "current price", |provider| {
            provider.fetch_current_price(ctx, symbol)
        })
        .await
    }

    /// Fetch OHLCV history from the first provider that succeeds.
    pub async fn get_history(
        &self,
        class: InstrumentClass,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.get_history_with(&FetchContext::new(), class, symbol, range)
            .await
    }

    /// [`get_history`](Self::get_history) under a caller-owned context.
    pub async fn get_history_with(
        &self,
        ctx: &FetchContext,
        class: InstrumentClass,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.fallback(ctx, class, symbol, "history", |provider| {
            provider.fetch_history(ctx, symbol, range)
        })
        .await
    }

    /// Try eligible providers in order until one succeeds.
    ///
    /// 1. No eligible provider: fail before calling anything
    /// 2. Each call is timed through [`ProviderMetrics`]
    /// 3. First success wins; failures are logged and the chain moves on
    /// 4. All failed: surface the last failure
    async fn fallback<'a, T, F>(
        &'a self,
        ctx: &'a FetchContext,
        class: InstrumentClass,
        symbol: &'a str,
        operation: &'static str,
        call: F,
    ) -> Result<T, MarketDataError>
    where
        F: Fn(&'a dyn MarketDataProvider) -> BoxFuture<'a, Result<T, MarketDataError>>,
    {
        let candidates: Vec<&'a dyn MarketDataProvider> = self
            .providers
            .iter()
            .filter(|p| p.supports(class))
            .map(|p| &**p as &'a dyn MarketDataProvider)
            .collect();

        if candidates.is_empty() {
            warn!("No provider available for instrument class {}", class);
            return Err(MarketDataError::NoProviderForClass(class));
        }

        info!(
            "Fetching {} for {} ({}) across {} provider(s)",
            operation,
            symbol,
            class,
            candidates.len()
        );

        let mut diagnostics = FetchDiagnostics::new();
        let mut last_error: Option<MarketDataError> = None;

        for (index, provider) in candidates.iter().enumerate() {
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            if ctx.is_cancelled() {
                for skipped in &candidates[index..] {
                    diagnostics.record_skip(Cow::Borrowed(skipped.id()), SkipReason::Cancelled);
                }
                info!(
                    "Request for {} cancelled: {}",
                    symbol,
                    diagnostics.summary()
                );
                return Err(MarketDataError::Cancelled);
            }

            debug!(
                "Trying provider '{}' ({}/{}) for {} of {}",
                provider_id,
                index + 1,
                candidates.len(),
                operation,
                symbol
            );

            let attempt = self
                .metrics
                .record_latency(provider.id(), symbol, call(*provider));

            let result = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    diagnostics.record_skip(provider_id, SkipReason::Cancelled);
                    info!(
                        "Request for {} cancelled mid-call: {}",
                        symbol,
                        diagnostics.summary()
                    );
                    return Err(MarketDataError::Cancelled);
                }
                result = attempt => result,
            };

            match result {
                Ok(value) => {
                    diagnostics.record_success(provider_id.clone());
                    info!(
                        "Fetched {} for {} from '{}'",
                        operation, symbol, provider_id
                    );
                    if diagnostics.called() > 1 {
                        debug!("Fallback chain: {}", diagnostics.summary());
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        "Provider '{}' failed for {}: {}, trying next provider",
                        provider_id, symbol, e
                    );
                    diagnostics.record_error(provider_id, e.to_string());
                    last_error = Some(e);
                }
            }
        }

        error!(
            "All providers failed for {} of {}: {}",
            operation,
            symbol,
            diagnostics.summary()
        );

        match last_error {
            Some(last) => Err(MarketDataError::AllProvidersFailed {
                attempted: diagnostics.called(),
                last: Box::new(last),
            }),
            None => Err(MarketDataError::NoProviderForClass(class)),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish_non_exhaustive()
    }
}
