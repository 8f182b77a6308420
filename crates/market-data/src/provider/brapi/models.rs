//! Brapi API response models.
//!
//! Shape of `GET /api/quote/{ticker}`, with and without `range`/`interval`.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level response wrapper
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrapiResponse {
    #[serde(default)]
    pub results: Vec<BrapiQuote>,
    /// Set on error payloads, together with `message`
    #[serde(default)]
    pub error: bool,
    pub message: Option<String>,
}

/// One quote entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrapiQuote {
    pub symbol: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub regular_market_price: Option<Decimal>,
    pub regular_market_change_percent: Option<Decimal>,
    pub regular_market_volume: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    /// Only present when `range` and `interval` were requested
    #[serde(default)]
    pub historical_data_price: Vec<BrapiHistoricalPrice>,
}

/// One history bar. `date` is epoch seconds.
#[derive(Debug, Deserialize)]
pub struct BrapiHistoricalPrice {
    pub date: i64,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
}
