use std::sync::Arc;

use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, main_lib::AppState};

pub mod health;
pub mod market;
#[cfg(feature = "metrics")]
pub mod metrics;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let router = Router::new()
        .merge(market::router())
        .merge(health::router());

    #[cfg(feature = "metrics")]
    let router = router.merge(metrics::router());

    router
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
