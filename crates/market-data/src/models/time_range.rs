use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Lookback window for history requests.
///
/// Parsed from the short tokens `1d`, `1w`, `1m`, `3m`, `6m`, `1y`, `5y`.
/// Each provider translates it into its own range/interval/day-count
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl TimeRange {
    pub const ALL: [TimeRange; 7] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::FiveYears,
    ];

    /// Parse a short range token. Case-insensitive, surrounding whitespace
    /// ignored. Unknown tokens are rejected, never defaulted.
    pub fn parse(value: &str) -> Result<Self, MarketDataError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            "1m" => Ok(Self::OneMonth),
            "3m" => Ok(Self::ThreeMonths),
            "6m" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "5y" => Ok(Self::FiveYears),
            _ => Err(MarketDataError::InvalidTimeRange(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
        }
    }

    /// Calendar date at which the window opens, counting back from `today`.
    pub fn cutoff_date(&self, today: NaiveDate) -> NaiveDate {
        let cutoff = match self {
            Self::OneDay => today.checked_sub_days(Days::new(1)),
            Self::OneWeek => today.checked_sub_days(Days::new(7)),
            Self::OneMonth => today.checked_sub_months(Months::new(1)),
            Self::ThreeMonths => today.checked_sub_months(Months::new(3)),
            Self::SixMonths => today.checked_sub_months(Months::new(6)),
            Self::OneYear => today.checked_sub_months(Months::new(12)),
            Self::FiveYears => today.checked_sub_months(Months::new(60)),
        };
        cutoff.unwrap_or(NaiveDate::MIN)
    }

    /// Start-of-day UTC instant at which the window opens. Points strictly
    /// before it fall outside the range.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.cutoff_date(now.date_naive())
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
