//! Yahoo Finance API response models.
//!
//! These models cover the v8 chart endpoint, which serves both the current
//! quote (in `meta`) and OHLCV bars (in `timestamp` + `indicators`).

use rust_decimal::Decimal;
use serde::Deserialize;

/// Main response wrapper for the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

/// Chart container. Exactly one of `result` and `error` is usually set.
#[derive(Debug, Deserialize)]
pub struct YahooChart {
    #[serde(default)]
    pub result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    pub error: Option<YahooChartError>,
}

/// Error object, e.g. `{"code":"Not Found","description":"No data found, symbol may be delisted"}`
#[derive(Debug, Deserialize)]
pub struct YahooChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl YahooChartError {
    pub fn message(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{}: {}", code, description),
            (None, Some(description)) => description.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown chart error".to_string(),
        }
    }
}

/// Individual result from the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: Option<YahooChartMeta>,
    /// Bar start times, epoch seconds. Absent on quote-only answers.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Option<YahooIndicators>,
}

/// Quote metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    pub symbol: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub regular_market_price: Option<Decimal>,
    pub regular_market_volume: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub chart_previous_close: Option<Decimal>,
    pub market_cap: Option<Decimal>,
}

/// Indicator arrays, parallel to `timestamp`
#[derive(Debug, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooQuoteIndicators>,
}

/// OHLCV columns. Yahoo fills gaps with `null`.
#[derive(Debug, Default, Deserialize)]
pub struct YahooQuoteIndicators {
    #[serde(default)]
    pub open: Vec<Option<Decimal>>,
    #[serde(default)]
    pub high: Vec<Option<Decimal>>,
    #[serde(default)]
    pub low: Vec<Option<Decimal>>,
    #[serde(default)]
    pub close: Vec<Option<Decimal>>,
    #[serde(default)]
    pub volume: Vec<Option<Decimal>>,
}
