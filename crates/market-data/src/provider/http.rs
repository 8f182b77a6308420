//! Outbound HTTP transport used by the provider adapters.
//!
//! Adapters talk to an [`HttpClient`] rather than to `reqwest` directly so
//! every call carries an explicit timeout and tests can script upstream
//! answers without a network.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::errors::MarketDataError;
use crate::models::ProviderId;

/// Default connect timeout for outbound provider calls.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Default read timeout for outbound provider calls.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Timeouts applied to every outbound call.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A GET request to an upstream provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL with query string, secrets masked. For logs only.
    pub fn redacted(&self, secrets: &[&str]) -> String {
        let mut rendered = self.url.clone();
        for (i, (k, v)) in self.query.iter().enumerate() {
            rendered.push(if i == 0 { '?' } else { '&' });
            rendered.push_str(k);
            rendered.push('=');
            if secrets.contains(&k.as_str()) {
                rendered.push_str("***");
            } else {
                rendered.push_str(v);
            }
        }
        rendered
    }
}

/// Raw upstream answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Map the HTTP status to the provider error taxonomy.
    ///
    /// 429 becomes [`MarketDataError::RateLimited`] so retry policies can
    /// recognize it; every other non-2xx status is a plain provider failure.
    pub fn error_for_status(
        self,
        provider: &ProviderId,
        subject: &str,
    ) -> Result<Self, MarketDataError> {
        match self.status {
            200..=299 => Ok(self),
            429 => Err(MarketDataError::RateLimited {
                provider: provider.clone(),
            }),
            400..=499 => Err(MarketDataError::provider(
                provider,
                format!("Client error fetching {}: HTTP {}", subject, self.status),
            )),
            500..=599 => Err(MarketDataError::provider(
                provider,
                format!("Server error fetching {}: HTTP {}", subject, self.status),
            )),
            status => Err(MarketDataError::provider(
                provider,
                format!("Unexpected status fetching {}: HTTP {}", subject, status),
            )),
        }
    }

    /// Decode the body as JSON into a provider-local response type.
    pub fn json<T: DeserializeOwned>(
        &self,
        provider: &ProviderId,
        subject: &str,
    ) -> Result<T, MarketDataError> {
        serde_json::from_str(&self.body).map_err(|e| {
            MarketDataError::provider(
                provider,
                format!("Failed to parse response for {}: {}", subject, e),
            )
        })
    }
}

/// Transport failure class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Transport-level HTTP error: no response was received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

impl HttpError {
    pub fn new(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(HttpErrorKind::Timeout, message)
    }

    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert into the provider failure surfaced to the registry.
    pub fn into_provider_error(self, provider: &ProviderId, subject: &str) -> MarketDataError {
        let what = match self.kind {
            HttpErrorKind::Timeout => "Timed out",
            HttpErrorKind::Connect => "Connection failed",
            HttpErrorKind::Other => "Request failed",
        };
        MarketDataError::provider(
            provider,
            format!("{} fetching {}: {}", what, subject, self.message),
        )
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract used by every adapter.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with the given connect timeout. Read timeouts are set
    /// per request.
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::timeout(e.to_string())
            } else if e.is_connect() {
                HttpError::new(HttpErrorKind::Connect, e.to_string())
            } else {
                HttpError::new(HttpErrorKind::Other, e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::timeout(e.to_string())
            } else {
                HttpError::new(
                    HttpErrorKind::Other,
                    format!("failed to read response body: {}", e),
                )
            }
        })?;

        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn provider() -> ProviderId {
        Cow::Borrowed("BRAPI")
    }

    #[test]
    fn test_request_builder_lowercases_headers() {
        let request = HttpRequest::get("https://example.test/quote")
            .header("User-Agent", "Mozilla/5.0")
            .query("range", "1mo")
            .timeout(Duration::from_millis(500));

        assert_eq!(
            request.headers.get("user-agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
        assert_eq!(request.query_value("range"), Some("1mo"));
        assert_eq!(request.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let request = HttpRequest::get("https://brapi.dev/api/quote/PETR4")
            .query("range", "1d")
            .query("token", "secret-token");
        assert_eq!(
            request.redacted(&["token"]),
            "https://brapi.dev/api/quote/PETR4?range=1d&token=***"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(HttpResponse::new(200, "{}")
            .error_for_status(&provider(), "PETR4")
            .is_ok());

        let err = HttpResponse::new(429, "")
            .error_for_status(&provider(), "PETR4")
            .unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));

        let err = HttpResponse::new(404, "")
            .error_for_status(&provider(), "PETR4")
            .unwrap_err();
        assert_eq!(err.to_string(), "[BRAPI] Client error fetching PETR4: HTTP 404");

        let err = HttpResponse::new(503, "")
            .error_for_status(&provider(), "PETR4")
            .unwrap_err();
        assert_eq!(err.to_string(), "[BRAPI] Server error fetching PETR4: HTTP 503");
    }

    #[test]
    fn test_transport_error_is_provider_failure() {
        let err = HttpError::timeout("operation timed out").into_provider_error(&provider(), "PETR4");
        assert_eq!(
            err.to_string(),
            "[BRAPI] Timed out fetching PETR4: operation timed out"
        );
        assert_eq!(err.provider_id(), Some("BRAPI"));
    }

    #[test]
    fn test_json_decode_failure_names_subject() {
        let response = HttpResponse::ok_json("not json");
        let err = response
            .json::<serde_json::Value>(&provider(), "PETR4")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse response for PETR4"));
    }
}
