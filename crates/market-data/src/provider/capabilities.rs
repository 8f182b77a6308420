//! Provider capabilities.
//!
//! Describes which instrument classes a provider claims, and where it sits
//! in the fallback order.

use crate::models::InstrumentClass;

/// Static registration data for a market data provider.
///
/// Used by the registry to decide which providers are eligible for a given
/// instrument class and in which order they are tried.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Instrument classes this provider serves.
    pub instrument_classes: &'static [InstrumentClass],

    /// Fallback rank. Lower values are tried first.
    pub priority: u8,
}

impl ProviderCapabilities {
    /// Whether this provider serves the given class.
    pub fn supports(&self, class: InstrumentClass) -> bool {
        self.instrument_classes.contains(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        let caps = ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Stock, InstrumentClass::Fii],
            priority: 1,
        };
        assert!(caps.supports(InstrumentClass::Stock));
        assert!(caps.supports(InstrumentClass::Fii));
        assert!(!caps.supports(InstrumentClass::Crypto));
    }
}
