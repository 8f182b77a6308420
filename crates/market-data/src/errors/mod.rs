//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ErrorKind`]: Coarse taxonomy the request layer maps to response classes
//! - [`RetryClass`]: Classification for the in-provider rate-limit retry

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::models::{InstrumentClass, ProviderId};

/// Errors that can occur during market data operations.
///
/// Provider failures always carry the originating provider id. The registry
/// treats every provider failure the same way (try the next candidate); only
/// the message differs.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Any adapter-level problem: unknown symbol, malformed or empty response,
    /// non-2xx status, transport failure.
    #[error("[{provider}] {message}")]
    Provider {
        /// The provider that failed
        provider: ProviderId,
        /// Human-readable cause
        message: String,
    },

    /// A single "too many requests" answer from the upstream source.
    #[error("[{provider}] Rate limited (HTTP 429)")]
    RateLimited {
        /// The provider that throttled the request
        provider: ProviderId,
    },

    /// Every retry attempt was throttled.
    #[error("[{provider}] Rate limit exceeded after {attempts} attempts for {symbol}")]
    RateLimitExceeded {
        /// The provider that kept throttling
        provider: ProviderId,
        /// Symbol being fetched
        symbol: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The backoff wait between two attempts was interrupted.
    #[error("[{provider}] Retry interrupted while fetching {symbol}")]
    Interrupted {
        /// The provider whose retry loop was interrupted
        provider: ProviderId,
        /// Symbol being fetched
        symbol: String,
    },

    /// No registered provider claims the instrument class.
    #[error("No provider available for instrument class: {0}")]
    NoProviderForClass(InstrumentClass),

    /// Unrecognized time range token.
    #[error("Invalid time range: '{0}'. Accepted values: 1d, 1w, 1m, 3m, 6m, 1y, 5y")]
    InvalidTimeRange(String),

    /// Unrecognized instrument class token.
    #[error("Invalid instrument class: '{0}'. Accepted values: CRYPTO, STOCK, FII")]
    InvalidInstrumentClass(String),

    /// Every eligible provider failed. Carries the last failure.
    #[error("All {attempted} provider(s) failed; last error: {last}")]
    AllProvidersFailed {
        /// Number of providers tried
        attempted: usize,
        /// Failure of the last (lowest priority) provider tried
        last: Box<MarketDataError>,
    },

    /// The caller cancelled the request before a provider succeeded.
    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse classification of a [`MarketDataError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Upstream provider failure (including all providers exhausted).
    Provider,
    /// No provider registered for the requested instrument class.
    NoEligibleProvider,
    /// Caller sent an unparseable range or class token.
    InvalidInput,
    /// Request cancelled by the caller.
    Cancelled,
}

impl MarketDataError {
    /// Build a generic provider failure.
    pub fn provider(provider: &ProviderId, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.clone(),
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider { .. }
            | Self::RateLimited { .. }
            | Self::RateLimitExceeded { .. }
            | Self::Interrupted { .. }
            | Self::AllProvidersFailed { .. } => ErrorKind::Provider,
            Self::NoProviderForClass(_) => ErrorKind::NoEligibleProvider,
            Self::InvalidTimeRange(_) | Self::InvalidInstrumentClass(_) => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Identity of the provider this failure originated from.
    ///
    /// For [`MarketDataError::AllProvidersFailed`] this is the provider of the
    /// last failure.
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::Provider { provider, .. }
            | Self::RateLimited { provider }
            | Self::RateLimitExceeded { provider, .. }
            | Self::Interrupted { provider, .. } => Some(provider.as_ref()),
            Self::AllProvidersFailed { last, .. } => last.provider_id(),
            _ => None,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::borrow::Cow;
    /// use quotewire_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: Cow::Borrowed("YAHOO_FINANCE") };
    /// assert_eq!(error.retry_class(), RetryClass::Backoff);
    ///
    /// let error = MarketDataError::InvalidTimeRange("2d".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Abort);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } => RetryClass::Backoff,
            _ => RetryClass::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn yahoo() -> ProviderId {
        Cow::Borrowed("YAHOO_FINANCE")
    }

    #[test]
    fn test_rate_limited_backs_off() {
        let error = MarketDataError::RateLimited { provider: yahoo() };
        assert_eq!(error.retry_class(), RetryClass::Backoff);
    }

    #[test]
    fn test_other_failures_abort() {
        let error = MarketDataError::provider(&yahoo(), "HTTP 500");
        assert_eq!(error.retry_class(), RetryClass::Abort);

        let error = MarketDataError::RateLimitExceeded {
            provider: yahoo(),
            symbol: "PETR4.SA".to_string(),
            attempts: 3,
        };
        assert_eq!(error.retry_class(), RetryClass::Abort);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            MarketDataError::provider(&yahoo(), "boom").kind(),
            ErrorKind::Provider
        );
        assert_eq!(
            MarketDataError::NoProviderForClass(InstrumentClass::Crypto).kind(),
            ErrorKind::NoEligibleProvider
        );
        assert_eq!(
            MarketDataError::InvalidTimeRange("2d".to_string()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            MarketDataError::InvalidInstrumentClass("BOND".to_string()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(MarketDataError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_all_providers_failed_exposes_last_provider() {
        let error = MarketDataError::AllProvidersFailed {
            attempted: 2,
            last: Box::new(MarketDataError::provider(
                &Cow::Borrowed("ALPHA_VANTAGE"),
                "Symbol not found: XXXX4.SAO",
            )),
        };
        assert_eq!(error.kind(), ErrorKind::Provider);
        assert_eq!(error.provider_id(), Some("ALPHA_VANTAGE"));
        assert!(error.to_string().contains("Symbol not found"));
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::provider(&Cow::Borrowed("BRAPI"), "No results for PETR4");
        assert_eq!(format!("{}", error), "[BRAPI] No results for PETR4");

        let error = MarketDataError::RateLimitExceeded {
            provider: yahoo(),
            symbol: "PETR4.SA".to_string(),
            attempts: 3,
        };
        assert_eq!(
            format!("{}", error),
            "[YAHOO_FINANCE] Rate limit exceeded after 3 attempts for PETR4.SA"
        );

        let error = MarketDataError::NoProviderForClass(InstrumentClass::Fii);
        assert_eq!(
            format!("{}", error),
            "No provider available for instrument class: FII"
        );
    }
}
