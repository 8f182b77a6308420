//! Yahoo Finance market data provider.
//!
//! Secondary source for B3 equities and fund shares, using the public v8
//! chart endpoint. Symbols keep their exchange suffix (`PETR4.SA`).
//!
//! Yahoo throttles aggressively and answers 429 to clients that look like
//! bots, so every request carries a browser `User-Agent` and every call
//! runs under [`RateLimitRetry`].

mod models;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::metrics::ProviderMetrics;
use crate::models::{
    normalize_series, Candle, FetchContext, InstrumentClass, PriceSnapshot, ProviderId, TimeRange,
    BRL,
};
use crate::provider::b3;
use crate::provider::http::{HttpClient, HttpRequest, HttpSettings};
use crate::provider::retry::RateLimitRetry;
use crate::provider::{MarketDataProvider, ProviderCapabilities};

use models::{YahooChartMeta, YahooChartResponse, YahooChartResult, YahooQuoteIndicators};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const PROVIDER_ID: &str = "YAHOO_FINANCE";
const PROVIDER: ProviderId = Cow::Borrowed(PROVIDER_ID);

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    http: Arc<dyn HttpClient>,
    metrics: ProviderMetrics,
    retry: RateLimitRetry,
    base_url: String,
    read_timeout: Duration,
}

impl YahooProvider {
    pub fn new(http: Arc<dyn HttpClient>, settings: &HttpSettings, metrics: ProviderMetrics) -> Self {
        Self {
            http,
            metrics,
            retry: RateLimitRetry::default(),
            base_url: BASE_URL.to_string(),
            read_timeout: settings.read_timeout,
        }
    }

    pub fn with_retry(mut self, retry: RateLimitRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Point the provider at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Chart `range` and `interval` tokens for a lookback window.
    pub fn range_params(range: TimeRange) -> (&'static str, &'static str) {
        match range {
            TimeRange::OneDay => ("1d", "5m"),
            TimeRange::OneWeek => ("5d", "15m"),
            TimeRange::OneMonth => ("1mo", "1d"),
            TimeRange::ThreeMonths => ("3mo", "1d"),
            TimeRange::SixMonths => ("6mo", "1d"),
            TimeRange::OneYear => ("1y", "1wk"),
            TimeRange::FiveYears => ("5y", "1mo"),
        }
    }

    /// Percent change from the previous close, rounded half-up to four
    /// places before scaling. Zero when there is no usable previous close or
    /// the values are out of range.
    pub fn change_percent(price: Decimal, previous_close: Option<Decimal>) -> Decimal {
        match previous_close {
            Some(prev) if prev > Decimal::ZERO => price
                .checked_sub(prev)
                .and_then(|delta| delta.checked_div(prev))
                .map(|ratio| ratio.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }

    /// One chart request, no retry.
    async fn fetch_chart(
        &self,
        symbol: &str,
        params: &[(&str, &str)],
    ) -> Result<YahooChartResult, MarketDataError> {
        let mut request = HttpRequest::get(format!("{}/{}", self.base_url, encode(symbol)))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .timeout(self.read_timeout);
        for (name, value) in params {
            request = request.query(*name, *value);
        }

        debug!("Yahoo request: {}", request.redacted(&[]));

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| e.into_provider_error(&PROVIDER, symbol))?;

        // 404 on unknown symbols still carries a chart.error object.
        if !response.is_success() && response.status != 429 {
            if let Ok(YahooChartResponse {
                chart: models::YahooChart {
                    error: Some(error), ..
                },
            }) = serde_json::from_str::<YahooChartResponse>(&response.body)
            {
                return Err(MarketDataError::provider(
                    &PROVIDER,
                    format!("{} ({}): HTTP {}", error.message(), symbol, response.status),
                ));
            }
        }

        let response = response.error_for_status(&PROVIDER, symbol)?;
        let body: YahooChartResponse = response.json(&PROVIDER, symbol)?;

        if let Some(error) = body.chart.error {
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("{} ({})", error.message(), symbol),
            ));
        }

        body.chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| {
                MarketDataError::provider(&PROVIDER, format!("No results for symbol: {}", symbol))
            })
    }

    fn to_snapshot(
        meta: YahooChartMeta,
        symbol: &str,
        ctx: &FetchContext,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let price = meta.regular_market_price.ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("No price in response for {}", symbol))
        })?;

        let previous_close = meta.previous_close.or(meta.chart_previous_close);
        let currency = meta
            .currency
            .map(Cow::Owned)
            .unwrap_or(BRL);

        let mut snapshot = PriceSnapshot::new(
            meta.symbol.as_deref().unwrap_or(symbol),
            price,
            currency,
            b3::infer_class(symbol),
            PROVIDER,
            ctx.now,
        );
        if let Some(name) = meta.short_name.or(meta.long_name) {
            snapshot.name = name;
        }
        snapshot.change_percent_24h = Self::change_percent(price, previous_close);
        snapshot.market_cap = meta.market_cap.unwrap_or_default();
        snapshot.volume_24h = meta.regular_market_volume.unwrap_or_default();
        Ok(snapshot)
    }

    /// Zip `timestamp[]` with the first quote indicator block. Bars without
    /// a close are gaps and are skipped.
    fn to_candles(result: YahooChartResult) -> Vec<Candle> {
        let quote = result
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .unwrap_or_default();

        let column = |values: &[Option<Decimal>], i: usize| -> Decimal {
            values.get(i).copied().flatten().unwrap_or(Decimal::ZERO)
        };

        let YahooQuoteIndicators {
            open,
            high,
            low,
            close,
            volume,
        } = quote;

        result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let close = close.get(i).copied().flatten()?;
                Candle::from_epoch_seconds(
                    *ts,
                    column(&open, i),
                    column(&high, i),
                    column(&low, i),
                    close,
                    column(&volume, i),
                )
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Stock, InstrumentClass::Fii],
            priority: 2,
        }
    }

    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let symbol = symbol.trim().to_uppercase();
        info!(provider = PROVIDER_ID, symbol = %symbol, "fetching current price");

        let result = self
            .retry
            .run(&PROVIDER, &symbol, ctx, &self.metrics, |_| {
                self.fetch_chart(&symbol, &[])
            })
            .await?;

        let meta = result.meta.ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("No quote metadata for {}", symbol))
        })?;
        Self::to_snapshot(meta, &symbol, ctx)
    }

    async fn fetch_history(
        &self,
        ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let symbol = symbol.trim().to_uppercase();
        let (chart_range, interval) = Self::range_params(range);
        info!(
            provider = PROVIDER_ID,
            symbol = %symbol,
            range = chart_range,
            interval,
            "fetching history"
        );

        let params = [("range", chart_range), ("interval", interval)];
        let result = self
            .retry
            .run(&PROVIDER, &symbol, ctx, &self.metrics, |_| {
                self.fetch_chart(&symbol, &params)
            })
            .await?;

        let candles = normalize_series(Self::to_candles(result));
        if candles.is_empty() {
            warn!(provider = PROVIDER_ID, symbol = %symbol, "no historical data returned");
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("No historical data for {} (range={})", symbol, chart_range),
            ));
        }
        Ok(candles)
    }
}
