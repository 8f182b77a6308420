//! Static provider configuration.

use std::fmt;

use crate::provider::{HttpSettings, RateLimitRetry};

/// Everything needed to build the default provider set.
///
/// Providers whose credential is missing or blank are not registered.
#[derive(Clone, Default)]
pub struct ProviderSettings {
    /// Timeouts for every outbound call
    pub http: HttpSettings,

    /// Brapi API token
    pub brapi_token: Option<String>,

    /// Alpha Vantage API key
    pub alpha_vantage_api_key: Option<String>,

    /// Throttling retry for Yahoo Finance
    pub yahoo_retry: RateLimitRetry,
}

impl ProviderSettings {
    pub fn brapi_token(&self) -> Option<&str> {
        non_blank(self.brapi_token.as_deref())
    }

    pub fn alpha_vantage_api_key(&self) -> Option<&str> {
        non_blank(self.alpha_vantage_api_key.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// Credentials stay out of logs.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: Option<&str>| v.map(|_| "***");
        f.debug_struct("ProviderSettings")
            .field("http", &self.http)
            .field("brapi_token", &mask(self.brapi_token()))
            .field("alpha_vantage_api_key", &mask(self.alpha_vantage_api_key()))
            .field("yahoo_retry", &self.yahoo_retry)
            .finish()
    }
}
