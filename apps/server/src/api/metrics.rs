use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, TextEncoder};

/// Prometheus text exposition of the provider metrics.
async fn get_metrics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.prometheus.gather(), &mut buffer)
        .map_err(anyhow::Error::from)?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(get_metrics))
}
