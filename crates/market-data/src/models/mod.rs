//! Market data models
//!
//! This module contains the canonical data types every provider produces:
//! - `types` - Type aliases for common identifiers (ProviderId, Currency)
//! - `instrument` - Instrument classification (InstrumentClass)
//! - `time_range` - History lookback windows (TimeRange)
//! - `quote` - Canonical values (PriceSnapshot, Candle)
//! - `context` - Per-request context and cancellation (FetchContext, CancelSignal)

mod context;
mod instrument;
mod quote;
mod time_range;
mod types;

pub use context::{CancelSignal, FetchContext};
pub use instrument::InstrumentClass;
pub use quote::{normalize_series, Candle, PriceSnapshot};
pub use time_range::TimeRange;
pub use types::{Currency, ProviderId, BRL, USD};
