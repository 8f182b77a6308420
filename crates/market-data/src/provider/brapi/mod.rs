//! Brapi market data provider.
//!
//! Primary source for B3 equities and fund shares (`https://brapi.dev`).
//! Requires an API token. Symbols are sent as bare B3 tickers: `PETR4.SA`
//! becomes `PETR4`.

mod models;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{
    normalize_series, Candle, FetchContext, InstrumentClass, PriceSnapshot, ProviderId, TimeRange,
    BRL,
};
use crate::provider::b3;
use crate::provider::http::{HttpClient, HttpRequest, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

use models::{BrapiHistoricalPrice, BrapiQuote, BrapiResponse};

const BASE_URL: &str = "https://brapi.dev/api/quote";

pub const PROVIDER_ID: &str = "BRAPI";
const PROVIDER: ProviderId = Cow::Borrowed(PROVIDER_ID);

/// Brapi market data provider.
pub struct BrapiProvider {
    http: Arc<dyn HttpClient>,
    token: String,
    base_url: String,
    read_timeout: Duration,
}

impl BrapiProvider {
    pub fn new(http: Arc<dyn HttpClient>, token: impl Into<String>, settings: &HttpSettings) -> Self {
        Self {
            http,
            token: token.into().trim().to_string(),
            base_url: BASE_URL.to_string(),
            read_timeout: settings.read_timeout,
        }
    }

    /// Point the provider at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Brapi `range` and `interval` tokens for a lookback window.
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

    /// Fetch the first quote entry for a ticker.
    async fn fetch_quote(
        &self,
        ticker: &str,
        extra: &[(&str, &str)],
    ) -> Result<BrapiQuote, MarketDataError> {
        let mut request = HttpRequest::get(format!("{}/{}", self.base_url, encode(ticker)))
            .timeout(self.read_timeout);
        for (name, value) in extra {
            request = request.query(*name, *value);
        }
        request = request.query("token", self.token.as_str());

        debug!("Brapi request: {}", request.redacted(&["token"]));

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| e.into_provider_error(&PROVIDER, ticker))?;

        // Brapi explains 4xx answers in an error payload; prefer its message.
        if !response.is_success() && response.status != 429 {
            if let Ok(BrapiResponse {
                error: true,
                message: Some(message),
                ..
            }) = serde_json::from_str::<BrapiResponse>(&response.body)
            {
                return Err(MarketDataError::provider(
                    &PROVIDER,
                    format!("{} ({}): HTTP {}", message, ticker, response.status),
                ));
            }
        }

        let response = response.error_for_status(&PROVIDER, ticker)?;
        let body: BrapiResponse = response.json(&PROVIDER, ticker)?;

        if body.error {
            let message = body.message.unwrap_or_else(|| "unknown error".to_string());
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("{} ({})", message, ticker),
            ));
        }

        body.results.into_iter().next().ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("No results for symbol: {}", ticker))
        })
    }

    fn to_snapshot(
        quote: BrapiQuote,
        ticker: &str,
        ctx: &FetchContext,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let price = quote.regular_market_price.ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("No price in response for {}", ticker))
        })?;

        let symbol = quote.symbol.unwrap_or_else(|| ticker.to_string());
        let currency = quote
            .currency
            .map(Cow::Owned)
            .unwrap_or(BRL);

        let mut snapshot = PriceSnapshot::new(
            &symbol,
            price,
            currency,
            b3::infer_class(ticker),
            PROVIDER,
            ctx.now,
        );
        if let Some(name) = quote.short_name.or(quote.long_name) {
            snapshot.name = name;
        }
        snapshot.change_percent_24h = quote.regular_market_change_percent.unwrap_or_default();
        snapshot.market_cap = quote.market_cap.unwrap_or_default();
        snapshot.volume_24h = quote.regular_market_volume.unwrap_or_default();
        Ok(snapshot)
    }

    fn to_candle(bar: BrapiHistoricalPrice) -> Option<Candle> {
        Candle::from_epoch_seconds(
            bar.date,
            bar.open.unwrap_or(Decimal::ZERO),
            bar.high.unwrap_or(Decimal::ZERO),
            bar.low.unwrap_or(Decimal::ZERO),
            bar.close.unwrap_or(Decimal::ZERO),
            bar.volume.unwrap_or(Decimal::ZERO),
        )
    }
}

#[async_trait]
impl MarketDataProvider for BrapiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Stock, InstrumentClass::Fii],
            priority: 1,
        }
    }

    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let ticker = b3::strip_sa_suffix(symbol);
        info!(provider = PROVIDER_ID, symbol = %ticker, "fetching current price");

        let quote = self.fetch_quote(&ticker, &[]).await?;
        Self::to_snapshot(quote, &ticker, ctx)
    }

    async fn fetch_history(
        &self,
        _ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let ticker = b3::strip_sa_suffix(symbol);
        let (brapi_range, interval) = Self::range_params(range);
        info!(
            provider = PROVIDER_ID,
            symbol = %ticker,
            range = brapi_range,
            interval,
            "fetching history"
        );

        let quote = self
            .fetch_quote(&ticker, &[("range", brapi_range), ("interval", interval)])
            .await?;

        let candles = normalize_series(
            quote
                .historical_data_price
                .into_iter()
                .filter_map(Self::to_candle)
                .collect(),
        );

        if candles.is_empty() {
            warn!(provider = PROVIDER_ID, symbol = %ticker, "no historical data returned");
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("No historical data for {} (range={})", ticker, brapi_range),
            ));
        }

        debug!(
            provider = PROVIDER_ID,
            symbol = %ticker,
            count = candles.len(),
            "history fetched"
        );
        Ok(candles)
    }
}
