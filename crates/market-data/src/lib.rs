//! Quotewire Market Data Crate
//!
//! This crate fetches current prices and OHLCV history for Brazilian stocks,
//! real-estate fund shares and crypto assets from several upstream providers,
//! falling back from one provider to the next when a call fails.
//!
//! # Overview
//!
//! - Instrument classes: `STOCK`, `FII`, `CRYPTO`
//! - Providers: Brapi, Yahoo Finance, Alpha Vantage, CoinGecko
//! - Exact decimal values throughout, never binary floating point
//! - Rate-limit retry with linear backoff for Yahoo Finance
//! - Latency and error metrics for every provider call
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! | ProviderRegistry |  (capability routing, ordered fallback)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | ProviderMetrics  | --> |   MetricsSink    |  (timers, counters)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (Brapi, Yahoo, AlphaVantage, CoinGecko)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   HttpClient     |  (reqwest in production, scripted in tests)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | PriceSnapshot /  |  (canonical model)
//! |     Candle       |
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`ProviderRegistry`] - Entry point: `get_current_price`, `get_history`
//! - [`PriceSnapshot`] - Current price of one instrument
//! - [`Candle`] - One OHLCV point
//! - [`InstrumentClass`] - Routing key for provider selection
//! - [`TimeRange`] - History lookback window
//! - [`FetchContext`] - Cancellation and reference time for one request

pub mod errors;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    normalize_series, CancelSignal, Candle, Currency, FetchContext, InstrumentClass,
    PriceSnapshot, ProviderId, TimeRange, BRL, USD,
};

pub use errors::{ErrorKind, MarketDataError, RetryClass};

pub use metrics::{InMemoryMetricsSink, MetricsSink, NoopMetricsSink, ProviderMetrics, TracingMetricsSink};

// Re-export provider types
pub use provider::{
    AlphaVantageProvider, BrapiProvider, CoinGeckoProvider, HttpClient, HttpSettings,
    MarketDataProvider, ProviderCapabilities, RateLimitRetry, ReqwestHttpClient, YahooProvider,
};

// Re-export registry types
pub use registry::{
    AttemptOutcome, FetchDiagnostics, ProviderAttempt, ProviderRegistry, ProviderSettings,
    SkipReason,
};
