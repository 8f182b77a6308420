use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::InstrumentClass;
use super::types::{Currency, ProviderId};

/// Current price of an instrument, as reported by the provider that won
/// the fallback chain.
///
/// Numeric fields are never absent: a value the provider did not report is
/// an explicit zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    /// Canonical, uppercase symbol
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Current price
    pub price: Decimal,

    /// Quote currency
    pub currency: Currency,

    /// 24h change, in percent
    pub change_percent_24h: Decimal,

    /// Market capitalization (zero when unknown)
    pub market_cap: Decimal,

    /// 24h traded volume
    pub volume_24h: Decimal,

    /// Instrument class
    pub instrument_class: InstrumentClass,

    /// Provider that produced this snapshot
    pub provider: ProviderId,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Create a snapshot with zeroed change, market cap and volume.
    pub fn new(
        symbol: &str,
        price: Decimal,
        currency: Currency,
        instrument_class: InstrumentClass,
        provider: ProviderId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let symbol = symbol.to_uppercase();
        Self {
            name: symbol.clone(),
            symbol,
            price,
            currency,
            change_percent_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            instrument_class,
            provider,
            timestamp,
        }
    }
}

/// One OHLCV point of a history series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Start of the bar, second precision
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Create a candle from epoch seconds. Returns `None` when the timestamp
    /// is out of range.
    pub fn from_epoch_seconds(
        seconds: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Option<Self> {
        let timestamp = Utc.timestamp_opt(seconds, 0).single()?;
        Some(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Create a candle from epoch milliseconds, truncated to whole seconds.
    pub fn from_epoch_millis(
        millis: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Option<Self> {
        Self::from_epoch_seconds(millis / 1000, open, high, low, close, volume)
    }

    /// Create a candle for a calendar date, stamped at start of day UTC.
    pub fn from_date(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Option<Self> {
        let timestamp = date.and_hms_opt(0, 0, 0)?.and_utc();
        Some(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Sort ascending by timestamp and drop duplicate timestamps (first wins).
pub fn normalize_series(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::borrow::Cow;

    fn candle(seconds: i64, close: Decimal) -> Candle {
        Candle::from_epoch_seconds(seconds, close, close, close, close, Decimal::ZERO).unwrap()
    }

    #[test]
    fn test_snapshot_new_defaults_to_zero() {
        let snapshot = PriceSnapshot::new(
            "petr4",
            dec!(38.15),
            Cow::Borrowed("BRL"),
            InstrumentClass::Stock,
            Cow::Borrowed("BRAPI"),
            Utc::now(),
        );
        assert_eq!(snapshot.symbol, "PETR4");
        assert_eq!(snapshot.name, "PETR4");
        assert_eq!(snapshot.price, dec!(38.15));
        assert_eq!(snapshot.change_percent_24h, Decimal::ZERO);
        assert_eq!(snapshot.market_cap, Decimal::ZERO);
        assert_eq!(snapshot.volume_24h, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = PriceSnapshot::new(
            "btc",
            dec!(67000.5),
            Cow::Borrowed("USD"),
            InstrumentClass::Crypto,
            Cow::Borrowed("COINGECKO"),
            Utc.with_ymd_and_hms(2026, 2, 19, 15, 0, 0).unwrap(),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["symbol"], "BTC");
        assert_eq!(json["instrumentClass"], "CRYPTO");
        assert_eq!(json["provider"], "COINGECKO");
        assert!(json.get("changePercent24h").is_some());
    }

    #[test]
    fn test_from_epoch_millis_truncates() {
        let c = Candle::from_epoch_millis(
            1_769_731_200_999,
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(0),
        )
        .unwrap();
        assert_eq!(c.timestamp.timestamp(), 1_769_731_200);
    }

    #[test]
    fn test_from_date_is_start_of_day_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let c = Candle::from_date(date, dec!(1), dec!(2), dec!(0.5), dec!(1.5), dec!(10)).unwrap();
        assert_eq!(c.timestamp, Utc.with_ymd_and_hms(2026, 2, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_candle_serializes_epoch_seconds() {
        let json = serde_json::to_value(candle(1_769_731_200, dec!(37.76))).unwrap();
        assert_eq!(json["timestamp"], 1_769_731_200_i64);
    }

    #[test]
    fn test_normalize_series_sorts_and_dedups() {
        let series = normalize_series(vec![
            candle(300, dec!(3)),
            candle(100, dec!(1)),
            candle(200, dec!(2)),
            candle(100, dec!(9)),
        ]);
        let stamps: Vec<i64> = series.iter().map(|c| c.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![100, 200, 300]);
        assert_eq!(series[0].close, dec!(1));
    }
}
