use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use quotewire_market_data::{ErrorKind, MarketDataError};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub timestamp: DateTime<Utc>,
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String, Option<String>) {
        match self {
            ApiError::MarketData(err) => match err.kind() {
                ErrorKind::Provider => (
                    StatusCode::BAD_GATEWAY,
                    err.to_string(),
                    err.provider_id().map(str::to_string),
                ),
                ErrorKind::InvalidInput | ErrorKind::NoEligibleProvider => {
                    (StatusCode::BAD_REQUEST, err.to_string(), None)
                }
                ErrorKind::Cancelled => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                    None,
                ),
            },
            ApiError::Anyhow(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, provider) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorBody {
            code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            provider,
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_all_failed_maps_to_bad_gateway_with_provider() {
        let err = ApiError::from(MarketDataError::AllProvidersFailed {
            attempted: 2,
            last: Box::new(MarketDataError::provider(
                &Cow::Borrowed("YAHOO_FINANCE"),
                "No results for symbol: XXXX4.SA",
            )),
        });
        let (status, message, provider) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(message.contains("No results for symbol"));
        assert_eq!(provider.as_deref(), Some("YAHOO_FINANCE"));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(anyhow::anyhow!("database password leaked"));
        let (status, message, provider) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, INTERNAL_MESSAGE);
        assert!(provider.is_none());

        let (status, _, _) = ApiError::from(MarketDataError::Cancelled).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err = ApiError::from(MarketDataError::InvalidTimeRange("2d".to_string()));
        let (status, message, _) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("2d"));
    }
}
