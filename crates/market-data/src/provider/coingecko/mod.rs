//! CoinGecko market data provider.
//!
//! Crypto-only source (`https://api.coingecko.com/api/v3`). Symbols are
//! CoinGecko coin ids (`bitcoin`, `ethereum`); all values are in USD.
//!
//! The `/ohlc` endpoint has no volume column, so history candles carry a
//! zero volume.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{
    normalize_series, Candle, FetchContext, InstrumentClass, PriceSnapshot, ProviderId, TimeRange,
    USD,
};
use crate::provider::http::{HttpClient, HttpRequest, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const VS_CURRENCY: &str = "usd";

pub const PROVIDER_ID: &str = "COINGECKO";
const PROVIDER: ProviderId = Cow::Borrowed(PROVIDER_ID);

// ============================================================================
// Response structures for CoinGecko API
// ============================================================================

/// `/coins/{id}` response, trimmed to the fields we map
#[derive(Debug, Deserialize)]
struct CoinResponse {
    symbol: Option<String>,
    name: Option<String>,
    market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: Option<UsdValue>,
    price_change_percentage_24h: Option<Decimal>,
    market_cap: Option<UsdValue>,
    total_volume: Option<UsdValue>,
}

/// Per-currency value map; only USD is read
#[derive(Debug, Deserialize)]
struct UsdValue {
    usd: Option<Decimal>,
}

/// `/coins/{id}/ohlc` row: `[timestamp_ms, open, high, low, close]`
type OhlcRow = Vec<Option<Decimal>>;

// ============================================================================
// CoinGeckoProvider implementation
// ============================================================================

/// CoinGecko market data provider.
pub struct CoinGeckoProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
    read_timeout: Duration,
}

impl CoinGeckoProvider {
    pub fn new(http: Arc<dyn HttpClient>, settings: &HttpSettings) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
            read_timeout: settings.read_timeout,
        }
    }

    /// Point the provider at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `days` parameter of the OHLC endpoint for a lookback window.
    pub fn days_param(range: TimeRange) -> &'static str {
        match range {
            TimeRange::OneDay => "1",
            TimeRange::OneWeek => "7",
            TimeRange::OneMonth => "30",
            TimeRange::ThreeMonths => "90",
            TimeRange::SixMonths => "180",
            TimeRange::OneYear => "365",
            TimeRange::FiveYears => "max",
        }
    }

    /// Coin ids are lowercase.
    fn coin_id(symbol: &str) -> String {
        symbol.trim().to_lowercase()
    }

    async fn get(&self, request: HttpRequest, coin_id: &str) -> Result<String, MarketDataError> {
        debug!("CoinGecko request: {}", request.redacted(&[]));

        let response = self
            .http
            .execute(request.timeout(self.read_timeout))
            .await
            .map_err(|e| e.into_provider_error(&PROVIDER, coin_id))?
            .error_for_status(&PROVIDER, coin_id)?;

        Ok(response.body)
    }

    fn to_snapshot(
        coin: CoinResponse,
        coin_id: &str,
        ctx: &FetchContext,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let data = coin.market_data.ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("No market_data for coin: {}", coin_id))
        })?;

        let price = data
            .current_price
            .and_then(|v| v.usd)
            .ok_or_else(|| {
                MarketDataError::provider(&PROVIDER, format!("No USD price for coin: {}", coin_id))
            })?;

        let symbol = coin.symbol.unwrap_or_else(|| coin_id.to_string());
        let mut snapshot = PriceSnapshot::new(
            &symbol,
            price,
            USD,
            InstrumentClass::Crypto,
            PROVIDER,
            ctx.now,
        );
        if let Some(name) = coin.name {
            snapshot.name = name;
        }
        snapshot.change_percent_24h = data.price_change_percentage_24h.unwrap_or_default();
        snapshot.market_cap = data.market_cap.and_then(|v| v.usd).unwrap_or_default();
        snapshot.volume_24h = data.total_volume.and_then(|v| v.usd).unwrap_or_default();
        Ok(snapshot)
    }

    /// Rows shorter than five entries, or without a timestamp, are dropped.
    fn to_candle(row: OhlcRow) -> Option<Candle> {
        if row.len() < 5 {
            return None;
        }
        let millis = row[0]?.trunc().to_i64()?;
        let value = |i: usize| row[i].unwrap_or(Decimal::ZERO);
        Candle::from_epoch_millis(millis, value(1), value(2), value(3), value(4), Decimal::ZERO)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Crypto],
            priority: 1,
        }
    }

    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let coin_id = Self::coin_id(symbol);
        info!("[{}] Fetching current price for {}", PROVIDER_ID, coin_id);

        let request = HttpRequest::get(format!("{}/coins/{}", self.base_url, encode(&coin_id)))
            .query("localization", "false")
            .query("tickers", "false")
            .query("community_data", "false")
            .query("developer_data", "false")
            .query("sparkline", "false");

        let body = self.get(request, &coin_id).await?;
        let coin: CoinResponse = serde_json::from_str(&body).map_err(|e| {
            MarketDataError::provider(
                &PROVIDER,
                format!("Failed to parse response for {}: {}", coin_id, e),
            )
        })?;

        Self::to_snapshot(coin, &coin_id, ctx)
    }

    async fn fetch_history(
        &self,
        _ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let coin_id = Self::coin_id(symbol);
        let days = Self::days_param(range);
        info!("[{}] Fetching OHLC history for {} (days={})", PROVIDER_ID, coin_id, days);

        let request = HttpRequest::get(format!("{}/coins/{}/ohlc", self.base_url, encode(&coin_id)))
            .query("vs_currency", VS_CURRENCY)
            .query("days", days);

        let body = self.get(request, &coin_id).await?;
        let rows: Vec<OhlcRow> = serde_json::from_str(&body).map_err(|e| {
            MarketDataError::provider(
                &PROVIDER,
                format!("Failed to parse OHLC response for {}: {}", coin_id, e),
            )
        })?;

        let candles = normalize_series(rows.into_iter().filter_map(Self::to_candle).collect());
        if candles.is_empty() {
            warn!("[{}] No OHLC data returned for {}", PROVIDER_ID, coin_id);
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("No historical data for {} (days={})", coin_id, days),
            ));
        }

        debug!("[{}] Returned {} candles for {}", PROVIDER_ID, candles.len(), coin_id);
        Ok(candles)
    }
}
