use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use quotewire_market_data::{HttpSettings, ProviderSettings, RateLimitRetry};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Whole-request budget enforced by the HTTP layer
    pub request_timeout: Duration,
    /// `text` or `json`
    pub log_format: String,
    pub providers: ProviderSettings,
}

impl Config {
    /// Load configuration from the environment (and a `.env` file, if any).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var("QW_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .with_context(|| format!("QW_LISTEN_ADDR is not a socket address: {listen_addr}"))?;

        let defaults = HttpSettings::default();
        let http = HttpSettings {
            connect_timeout: millis(&var, "QW_PROVIDER_CONNECT_TIMEOUT_MS")?
                .unwrap_or(defaults.connect_timeout),
            read_timeout: millis(&var, "QW_PROVIDER_READ_TIMEOUT_MS")?
                .unwrap_or(defaults.read_timeout),
        };

        let retry_defaults = RateLimitRetry::default();
        let yahoo_retry = RateLimitRetry::new(
            parsed(&var, "QW_YAHOO_MAX_ATTEMPTS")?.unwrap_or(retry_defaults.max_attempts),
            millis(&var, "QW_YAHOO_BACKOFF_MS")?.unwrap_or(retry_defaults.base_delay),
        );

        Ok(Self {
            listen_addr,
            request_timeout: millis(&var, "QW_REQUEST_TIMEOUT_MS")?
                .unwrap_or(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)),
            log_format: var("QW_LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            providers: ProviderSettings {
                http,
                brapi_token: var("QW_BRAPI_TOKEN"),
                alpha_vantage_api_key: var("QW_ALPHAVANTAGE_API_KEY"),
                yahoo_retry,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            log_format: "text".to_string(),
            providers: ProviderSettings::default(),
        }
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {raw}"))
        })
        .transpose()
}

fn millis(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    Ok(parsed::<u64>(var, key)?.map(Duration::from_millis))
}
