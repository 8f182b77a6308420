//! B3 (Brazilian exchange) ticker conventions.
//!
//! Callers address B3 listings with Yahoo-style `.SA` symbols. Each adapter
//! picks the helper matching its own vocabulary.

use crate::models::InstrumentClass;

/// Yahoo-style suffix for B3 listings.
pub const SA_SUFFIX: &str = ".SA";

/// Alpha Vantage suffix for B3 listings.
pub const SAO_SUFFIX: &str = ".SAO";

/// Uppercase a symbol and drop a trailing `.SA`, giving the bare B3 ticker.
pub fn strip_sa_suffix(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    match upper.strip_suffix(SA_SUFFIX) {
        Some(bare) => bare.to_string(),
        None => upper,
    }
}

/// Whether the symbol carries the `.SA` suffix (any case).
pub fn has_sa_suffix(symbol: &str) -> bool {
    symbol.trim().to_uppercase().ends_with(SA_SUFFIX)
}

/// Rewrite `.SA` to `.SAO`; other symbols pass through uppercased.
pub fn to_sao_suffix(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    match upper.strip_suffix(SA_SUFFIX) {
        Some(bare) => format!("{}{}", bare, SAO_SUFFIX),
        None => upper,
    }
}

/// Fund-share tickers are four letters followed by `11` (e.g. `HGLG11`).
pub fn is_fund_share(symbol: &str) -> bool {
    let ticker = strip_sa_suffix(symbol);
    let bytes = ticker.as_bytes();
    bytes.len() == 6
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && &bytes[4..] == b"11"
}

/// Class of a B3 symbol when the source does not report it.
pub fn infer_class(symbol: &str) -> InstrumentClass {
    if is_fund_share(symbol) {
        InstrumentClass::Fii
    } else {
        InstrumentClass::Stock
    }
}
