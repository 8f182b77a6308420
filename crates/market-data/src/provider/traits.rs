//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Candle, FetchContext, InstrumentClass, PriceSnapshot, TimeRange};

use super::capabilities::ProviderCapabilities;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
/// Each implementation owns one external schema: it builds the request,
/// decides what counts as success, and maps the raw response into the
/// canonical model. Raw response types never leave the implementation.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use quotewire_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             instrument_classes: &[InstrumentClass::Stock],
///             priority: 5,
///         }
///     }
///
///     // ... implement fetch methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "BRAPI", "COINGECKO", etc.
    /// Used for logging, metrics tags, and error attribution.
    fn id(&self) -> &'static str;

    /// Instrument classes served and fallback rank.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Provider priority for ordering. Lower values = higher priority.
    fn priority(&self) -> u8 {
        self.capabilities().priority
    }

    /// Whether this provider may serve the given instrument class.
    fn supports(&self, class: InstrumentClass) -> bool {
        self.capabilities().supports(class)
    }

    /// Fetch the current price for a symbol.
    ///
    /// An unknown symbol or an empty payload is an error, never a zeroed
    /// snapshot.
    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError>;

    /// Fetch OHLCV history for a symbol.
    ///
    /// The returned candles are sorted ascending by timestamp with no
    /// duplicate timestamps.
    async fn fetch_history(
        &self,
        ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
