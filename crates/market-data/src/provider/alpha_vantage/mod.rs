//! Alpha Vantage market data provider implementation.
//!
//! Global equities through two endpoints:
//! - `GLOBAL_QUOTE` for the current price
//! - `TIME_SERIES_DAILY` for history
//!
//! B3 listings use the `.SAO` suffix here (`PETR4.SA` becomes `PETR4.SAO`).
//! The daily series comes back as either the last 100 points or the full
//! history, so results are cut at the requested window locally.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute and
//! reports throttling in the body, not with a 429.

use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{
    normalize_series, Candle, FetchContext, InstrumentClass, PriceSnapshot, ProviderId, TimeRange,
    BRL, USD,
};
use crate::provider::b3;
use crate::provider::http::{HttpClient, HttpRequest, HttpSettings};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";

pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const PROVIDER: ProviderId = Cow::Borrowed(PROVIDER_ID);

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// Fields every Alpha Vantage payload may carry instead of data
#[derive(Debug, Default, Deserialize)]
struct ApiNotice {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(flatten)]
    notice: ApiNotice,
}

/// All values arrive as strings, e.g. `"05. price": "38.1500"`
#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// TIME_SERIES_DAILY response for equities
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyQuote>>,
    #[serde(flatten)]
    notice: ApiNotice,
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    #[serde(rename = "1. open")]
    open: Option<String>,
    #[serde(rename = "2. high")]
    high: Option<String>,
    #[serde(rename = "3. low")]
    low: Option<String>,
    #[serde(rename = "4. close")]
    close: Option<String>,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    http: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    read_timeout: Duration,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(http: Arc<dyn HttpClient>, api_key: impl Into<String>, settings: &HttpSettings) -> Self {
        Self {
            http,
            api_key: api_key.into().trim().to_string(),
            base_url: BASE_URL.to_string(),
            read_timeout: settings.read_timeout,
        }
    }

    /// Point the provider at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `outputsize` for a lookback window: the last 100 points cover up to a
    /// month of trading days.
    pub fn output_size(range: TimeRange) -> &'static str {
        match range {
            TimeRange::OneDay | TimeRange::OneWeek | TimeRange::OneMonth => "compact",
            _ => "full",
        }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)], subject: &str) -> Result<String, MarketDataError> {
        let mut request = HttpRequest::get(&self.base_url).timeout(self.read_timeout);
        for (name, value) in params {
            request = request.query(*name, *value);
        }
        request = request.query("apikey", self.api_key.as_str());

        debug!("Alpha Vantage request: {}", request.redacted(&["apikey"]));

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| e.into_provider_error(&PROVIDER, subject))?
            .error_for_status(&PROVIDER, subject)?;

        Ok(response.body)
    }

    /// Check for API-level errors in the response.
    fn check_api_error(notice: &ApiNotice, subject: &str) -> Result<(), MarketDataError> {
        if let Some(ref msg) = notice.error_message {
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("{} ({})", msg, subject),
            ));
        }

        // "Note" usually indicates rate limiting
        if let Some(ref msg) = notice.note {
            if Self::is_throttle_message(msg) {
                return Err(MarketDataError::RateLimited { provider: PROVIDER });
            }
            warn!("Alpha Vantage note: {}", msg);
        }

        // "Information" replaces the payload: throttling, premium endpoint, bad key
        if let Some(ref msg) = notice.information {
            if Self::is_throttle_message(msg) {
                return Err(MarketDataError::RateLimited { provider: PROVIDER });
            }
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("Alpha Vantage returned: {}", msg),
            ));
        }

        Ok(())
    }

    fn is_throttle_message(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("call frequency") || lower.contains("rate limit")
    }

    /// Parse a decimal value from a string. Blank or malformed values are zero.
    fn parse_decimal(s: Option<&str>) -> Decimal {
        s.map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| Decimal::from_str(v).ok())
            .unwrap_or(Decimal::ZERO)
    }

    /// `"0.9260%"` -> `0.9260`
    fn parse_change_percent(s: Option<&str>) -> Decimal {
        let raw = s.unwrap_or_default().replace('%', "");
        let raw = raw.trim();
        if raw.is_empty() {
            return Decimal::ZERO;
        }
        Decimal::from_str(raw).unwrap_or_else(|_| {
            warn!("Alpha Vantage: failed to parse change percent: {}", raw);
            Decimal::ZERO
        })
    }

    fn to_snapshot(
        quote: GlobalQuote,
        requested: &str,
        av_symbol: &str,
        ctx: &FetchContext,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let (symbol, price) = match (quote.symbol, quote.price.as_deref()) {
            (Some(symbol), Some(price)) => (symbol, price.trim().to_string()),
            _ => {
                return Err(MarketDataError::provider(
                    &PROVIDER,
                    format!("Symbol not found: {}", av_symbol),
                ))
            }
        };

        let price = Decimal::from_str(&price).map_err(|e| {
            MarketDataError::provider(
                &PROVIDER,
                format!("Invalid price '{}' for {}: {}", price, av_symbol, e),
            )
        })?;

        let currency = if b3::has_sa_suffix(requested) { BRL } else { USD };

        let mut snapshot = PriceSnapshot::new(
            &symbol,
            price,
            currency,
            InstrumentClass::Stock,
            PROVIDER,
            ctx.now,
        );
        snapshot.name = requested.trim().to_uppercase();
        snapshot.change_percent_24h = Self::parse_change_percent(quote.change_percent.as_deref());
        snapshot.volume_24h = Self::parse_decimal(quote.volume.as_deref());
        Ok(snapshot)
    }

    fn to_candle(date: &str, bar: &DailyQuote) -> Option<Candle> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        Candle::from_date(
            date,
            Self::parse_decimal(bar.open.as_deref()),
            Self::parse_decimal(bar.high.as_deref()),
            Self::parse_decimal(bar.low.as_deref()),
            Self::parse_decimal(bar.close.as_deref()),
            Self::parse_decimal(bar.volume.as_deref()),
        )
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Stock],
            priority: 3,
        }
    }

    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        let av_symbol = b3::to_sao_suffix(symbol);
        info!("[{}] Fetching current price for {} (AV: {})", PROVIDER_ID, symbol, av_symbol);

        let body = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", av_symbol.as_str())], &av_symbol)
            .await?;

        let response: GlobalQuoteResponse = serde_json::from_str(&body).map_err(|e| {
            MarketDataError::provider(
                &PROVIDER,
                format!("Failed to parse response for {}: {}", av_symbol, e),
            )
        })?;
        Self::check_api_error(&response.notice, &av_symbol)?;

        let quote = response.global_quote.ok_or_else(|| {
            MarketDataError::provider(&PROVIDER, format!("Symbol not found: {}", av_symbol))
        })?;

        Self::to_snapshot(quote, symbol, &av_symbol, ctx)
    }

    async fn fetch_history(
        &self,
        ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let av_symbol = b3::to_sao_suffix(symbol);
        let output_size = Self::output_size(range);
        info!(
            "[{}] Fetching history for {} (outputsize={})",
            PROVIDER_ID, av_symbol, output_size
        );

        let body = self
            .fetch(
                &[
                    ("function", "TIME_SERIES_DAILY"),
                    ("symbol", av_symbol.as_str()),
                    ("outputsize", output_size),
                ],
                &av_symbol,
            )
            .await?;

        let response: TimeSeriesResponse = serde_json::from_str(&body).map_err(|e| {
            MarketDataError::provider(
                &PROVIDER,
                format!("Failed to parse history response for {}: {}", av_symbol, e),
            )
        })?;
        Self::check_api_error(&response.notice, &av_symbol)?;

        let cutoff = range.cutoff_from(ctx.now);
        let candles: Vec<Candle> = response
            .time_series
            .unwrap_or_default()
            .iter()
            .filter_map(|(date, bar)| Self::to_candle(date, bar))
            .filter(|c| c.timestamp >= cutoff)
            .collect();
        let candles = normalize_series(candles);

        if candles.is_empty() {
            warn!("[{}] No historical data for {} since {}", PROVIDER_ID, av_symbol, cutoff);
            return Err(MarketDataError::provider(
                &PROVIDER,
                format!("No historical data for {} (range={})", av_symbol, range),
            ));
        }

        debug!(
            "[{}] Returned {} candles for {} (cutoff={})",
            PROVIDER_ID,
            candles.len(),
            av_symbol,
            cutoff.date_naive()
        );
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::testing::ScriptedHttpClient;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn ctx() -> FetchContext {
        FetchContext::at(Utc.with_ymd_and_hms(2026, 2, 19, 15, 0, 0).unwrap())
    }

    fn provider(http: Arc<ScriptedHttpClient>) -> AlphaVantageProvider {
        AlphaVantageProvider::new(http, "demo-key", &HttpSettings::default())
    }

    #[test]
    fn test_output_size() {
        assert_eq!(AlphaVantageProvider::output_size(TimeRange::OneDay), "compact");
        assert_eq!(AlphaVantageProvider::output_size(TimeRange::OneMonth), "compact");
        assert_eq!(AlphaVantageProvider::output_size(TimeRange::ThreeMonths), "full");
        assert_eq!(AlphaVantageProvider::output_size(TimeRange::FiveYears), "full");
    }

    #[test]
    fn test_parse_change_percent() {
        assert_eq!(AlphaVantageProvider::parse_change_percent(Some("0.9260%")), dec!(0.926));
        assert_eq!(AlphaVantageProvider::parse_change_percent(Some("-1.5%")), dec!(-1.5));
        assert_eq!(AlphaVantageProvider::parse_change_percent(Some("n/a")), Decimal::ZERO);
        assert_eq!(AlphaVantageProvider::parse_change_percent(None), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_global_quote_for_b3_symbol() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{"Global Quote": {
                "01. symbol": "PETR4.SAO",
                "02. open": "37.9000",
                "05. price": "38.1500",
                "06. volume": "42000000",
                "07. latest trading day": "2026-02-18",
                "08. previous close": "37.8000",
                "10. change percent": "0.9259%"
            }}"#,
        );

        let snapshot = provider(http.clone())
            .fetch_current_price(&ctx(), "petr4.sa")
            .await
            .unwrap();

        assert_eq!(snapshot.symbol, "PETR4.SAO");
        assert_eq!(snapshot.name, "PETR4.SA");
        assert_eq!(snapshot.price, dec!(38.15));
        assert_eq!(snapshot.currency, "BRL");
        assert_eq!(snapshot.change_percent_24h, dec!(0.9259));
        assert_eq!(snapshot.volume_24h, dec!(42000000));
        assert_eq!(snapshot.market_cap, Decimal::ZERO);
        assert_eq!(snapshot.instrument_class, InstrumentClass::Stock);

        let request = &http.requests()[0];
        assert_eq!(request.url, "https://www.alphavantage.co/query");
        assert_eq!(request.query_value("function"), Some("GLOBAL_QUOTE"));
        assert_eq!(request.query_value("symbol"), Some("PETR4.SAO"));
        assert_eq!(request.query_value("apikey"), Some("demo-key"));
    }

    #[tokio::test]
    async fn test_us_symbol_is_usd() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{"Global Quote": {"01. symbol": "IBM", "05. price": "250.10", "10. change percent": "-0.2%"}}"#,
        );

        let snapshot = provider(http).fetch_current_price(&ctx(), "IBM").await.unwrap();
        assert_eq!(snapshot.currency, "USD");
        assert_eq!(snapshot.volume_24h, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_trimmed_and_long_fraction_exact() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{"Global Quote": {"01. symbol": "IBM", "05. price": "1234567.123456789012345", "06. volume": "98765432109876.54321"}}"#,
        );

        let snapshot = provider(http.clone())
            .with_base_url("http://localhost:9090/query/")
            .fetch_current_price(&ctx(), "IBM")
            .await
            .unwrap();

        assert_eq!(snapshot.price, dec!(1234567.123456789012345));
        assert_eq!(snapshot.volume_24h, dec!(98765432109876.54321));
        assert_eq!(http.requests()[0].url, "http://localhost:9090/query");
    }

    #[tokio::test]
    async fn test_empty_quote_is_symbol_not_found() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(200, r#"{"Global Quote": {}}"#);

        let err = provider(http)
            .fetch_current_price(&ctx(), "XXXX4.SA")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "[ALPHA_VANTAGE] Symbol not found: XXXX4.SAO");
        assert_eq!(err.provider_id(), Some(PROVIDER_ID));
    }

    #[tokio::test]
    async fn test_api_notices() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        );
        http.push_json(
            200,
            r#"{"Information": "The **demo** API key is for demo purposes only."}"#,
        );
        http.push_json(
            200,
            r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#,
        );
        let av = provider(http);

        let err = av.fetch_current_price(&ctx(), "IBM").await.unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));

        let err = av.fetch_current_price(&ctx(), "IBM").await.unwrap_err();
        assert!(err.to_string().contains("Alpha Vantage returned: The **demo** API key"));

        let err = av.fetch_current_price(&ctx(), "IBM").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[ALPHA_VANTAGE] Invalid API call. Please retry or visit the documentation. (IBM)"
        );
    }

    #[tokio::test]
    async fn test_history_cut_at_window_and_sorted() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{
                "Meta Data": {"2. Symbol": "PETR4.SAO"},
                "Time Series (Daily)": {
                    "2026-02-18": {"1. open": "38.0", "2. high": "38.9", "3. low": "37.7", "4. close": "38.5", "5. volume": "1000"},
                    "2026-02-12": {"1. open": "37.0", "2. high": "37.5", "3. low": "36.8", "4. close": "37.2", "5. volume": "800"},
                    "2026-02-13": {"1. open": "37.2", "2. high": "37.9", "3. low": "37.1", "4. close": "37.8", "5. volume": "900"},
                    "2026-02-11": {"1. open": "36.0", "2. high": "36.5", "3. low": "35.8", "4. close": "36.2", "5. volume": "700"},
                    "not-a-date": {"4. close": "1"}
                }
            }"#,
        );

        let candles = provider(http.clone())
            .fetch_history(&ctx(), "PETR4.SA", TimeRange::OneWeek)
            .await
            .unwrap();

        // now = 2026-02-19, one week back = 2026-02-12 00:00 UTC (inclusive)
        let dates: Vec<String> = candles
            .iter()
            .map(|c| c.timestamp.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2026-02-12", "2026-02-13", "2026-02-18"]);
        assert_eq!(candles[2].close, dec!(38.5));
        assert_eq!(candles[0].volume, dec!(800));

        let request = &http.requests()[0];
        assert_eq!(request.query_value("function"), Some("TIME_SERIES_DAILY"));
        assert_eq!(request.query_value("outputsize"), Some("compact"));
    }

    #[tokio::test]
    async fn test_history_all_before_cutoff_is_failure() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            200,
            r#"{"Time Series (Daily)": {
                "2020-01-02": {"1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1"}
            }}"#,
        );

        let err = provider(http)
            .fetch_history(&ctx(), "IBM", TimeRange::OneYear)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "[ALPHA_VANTAGE] No historical data for IBM (range=1y)"
        );
    }
}
