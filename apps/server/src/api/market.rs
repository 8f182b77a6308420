use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use quotewire_market_data::{Candle, InstrumentClass, PriceSnapshot, TimeRange};

const DEFAULT_RANGE: &str = "1m";

#[derive(serde::Deserialize)]
struct HistoryQuery {
    range: Option<String>,
}

async fn get_current_price(
    Path((class, symbol)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PriceSnapshot>> {
    let class: InstrumentClass = class.parse()?;
    let snapshot = state.registry.get_current_price(class, &symbol).await?;
    Ok(Json(snapshot))
}

async fn get_history(
    Path((class, symbol)): Path<(String, String)>,
    Query(q): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Candle>>> {
    let class: InstrumentClass = class.parse()?;
    let range = TimeRange::parse(q.range.as_deref().unwrap_or(DEFAULT_RANGE))?;
    let candles = state.registry.get_history(class, &symbol, range).await?;
    Ok(Json(candles))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/market/{class}/{symbol}", get(get_current_price))
        .route("/market/{class}/{symbol}/history", get(get_history))
}
