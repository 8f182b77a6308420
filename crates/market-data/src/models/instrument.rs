use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Instrument classification.
///
/// Drives which providers are eligible to serve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentClass {
    /// Cryptocurrency (e.g. bitcoin)
    Crypto,
    /// Plain equity (e.g. PETR4.SA, IBM)
    Stock,
    /// Brazilian real-estate fund share (e.g. HGLG11.SA)
    Fii,
}

impl InstrumentClass {
    /// All classes, in declaration order.
    pub const ALL: [InstrumentClass; 3] = [Self::Crypto, Self::Stock, Self::Fii];

    /// Wire token for this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crypto => "CRYPTO",
            Self::Stock => "STOCK",
            Self::Fii => "FII",
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentClass {
    type Err = MarketDataError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRYPTO" => Ok(Self::Crypto),
            "STOCK" => Ok(Self::Stock),
            "FII" => Ok(Self::Fii),
            _ => Err(MarketDataError::InvalidInstrumentClass(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("crypto".parse::<InstrumentClass>().unwrap(), InstrumentClass::Crypto);
        assert_eq!("Stock".parse::<InstrumentClass>().unwrap(), InstrumentClass::Stock);
        assert_eq!(" fii ".parse::<InstrumentClass>().unwrap(), InstrumentClass::Fii);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "BOND".parse::<InstrumentClass>().unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidInstrumentClass(ref s) if s == "BOND"));
        assert!("".parse::<InstrumentClass>().is_err());
    }

    #[test]
    fn test_display_round_trips_tokens() {
        for class in InstrumentClass::ALL {
            assert_eq!(class.to_string().parse::<InstrumentClass>().unwrap(), class);
        }
    }

    #[test]
    fn test_serde_tokens() {
        let json = serde_json::to_string(&InstrumentClass::Fii).unwrap();
        assert_eq!(json, "\"FII\"");
    }
}
