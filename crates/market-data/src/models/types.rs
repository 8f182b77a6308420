use std::borrow::Cow;

/// Provider identifier, one constant per adapter ("BRAPI", "COINGECKO", ...)
pub type ProviderId = Cow<'static, str>;

/// Currency code (ISO 4217)
pub type Currency = Cow<'static, str>;

/// Brazilian real, the quote currency of B3 listings.
pub const BRL: Currency = Cow::Borrowed("BRL");

/// US dollar, the quote currency of crypto assets and non-B3 listings.
pub const USD: Currency = Cow::Borrowed("USD");
