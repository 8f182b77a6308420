//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities (served instrument classes and fallback rank)
//! - The HTTP transport seam and the rate-limit retry policy
//! - Concrete provider implementations (Brapi, Yahoo, Alpha Vantage, CoinGecko)
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The registry only sees `MarketDataProvider`
//! - **Self-contained**: Each provider owns its request format, response
//!   models, symbol conventions and range vocabulary. Raw response types
//!   never leave the provider module.
//! - **Testable**: Providers talk to an injected `HttpClient`

mod capabilities;
mod traits;

pub mod b3;
pub mod http;
pub mod retry;

pub mod alpha_vantage;
pub mod brapi;
pub mod coingecko;
pub mod yahoo;

// Re-exports
pub use alpha_vantage::AlphaVantageProvider;
pub use brapi::BrapiProvider;
pub use capabilities::ProviderCapabilities;
pub use coingecko::CoinGeckoProvider;
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, HttpSettings, ReqwestHttpClient};
pub use retry::{RateLimitRetry, RetryState};
pub use traits::MarketDataProvider;
pub use yahoo::YahooProvider;
