use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use quotewire_market_data::{
    Candle, FetchContext, InstrumentClass, MarketDataError, MarketDataProvider, PriceSnapshot,
    ProviderCapabilities, ProviderMetrics, ProviderRegistry, TimeRange,
};
use quotewire_server::{api::app_router, config::Config, AppState};

struct FixedProvider {
    id: &'static str,
    priority: u8,
    price: Option<Decimal>,
}

#[async_trait]
impl MarketDataProvider for FixedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_classes: &[InstrumentClass::Stock, InstrumentClass::Fii],
            priority: self.priority,
        }
    }

    async fn fetch_current_price(
        &self,
        ctx: &FetchContext,
        symbol: &str,
    ) -> Result<PriceSnapshot, MarketDataError> {
        match self.price {
            Some(price) => Ok(PriceSnapshot::new(
                symbol,
                price,
                Cow::Borrowed("BRL"),
                InstrumentClass::Stock,
                Cow::Borrowed(self.id),
                ctx.now,
            )),
            None => Err(MarketDataError::provider(
                &Cow::Borrowed(self.id),
                format!("No results for symbol: {}", symbol),
            )),
        }
    }

    async fn fetch_history(
        &self,
        ctx: &FetchContext,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Candle>, MarketDataError> {
        match self.price {
            Some(price) => Ok(vec![Candle {
                timestamp: range.cutoff_from(ctx.now),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: Decimal::ZERO,
            }]),
            None => Err(MarketDataError::provider(
                &Cow::Borrowed(self.id),
                format!("No historical data for {} (range={})", symbol, range),
            )),
        }
    }
}

fn test_router(providers: Vec<FixedProvider>) -> axum::Router {
    let providers = providers
        .into_iter()
        .map(|p| Arc::new(p) as Arc<dyn MarketDataProvider>)
        .collect();
    let registry = ProviderRegistry::new(providers, ProviderMetrics::noop());

    #[cfg(not(feature = "metrics"))]
    let state = AppState::new(registry);
    #[cfg(feature = "metrics")]
    let state = AppState::new(registry, prometheus::Registry::new());

    app_router(Arc::new(state), &Config::default())
}

fn fallback_router() -> axum::Router {
    test_router(vec![
        FixedProvider {
            id: "PRIMARY",
            priority: 1,
            price: None,
        },
        FixedProvider {
            id: "SECONDARY",
            priority: 2,
            price: Some(dec!(10.50)),
        },
    ])
}

async fn get_json(app: axum::Router, uri: &str) -> (u16, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn current_price_uses_fallback_provider() {
    let (status, json) = get_json(fallback_router(), "/market/stock/XXXX4.SA").await;

    assert_eq!(status, 200);
    assert_eq!(json["provider"], "SECONDARY");
    assert_eq!(json["symbol"], "XXXX4.SA");
    assert_eq!(json["currency"], "BRL");
}

#[tokio::test]
async fn history_defaults_to_one_month() {
    let (status, json) = get_json(fallback_router(), "/market/FII/HGLG11.SA/history").await;

    assert_eq!(status, 200);
    assert_eq!(json.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn invalid_range_is_bad_request() {
    let (status, json) =
        get_json(fallback_router(), "/market/STOCK/PETR4.SA/history?range=2d").await;

    assert_eq!(status, 400);
    assert_eq!(json["code"], 400);
    assert!(json["message"].as_str().unwrap().contains("2d"));
    assert!(json.get("provider").is_none());
}

#[tokio::test]
async fn invalid_class_and_unserved_class_are_bad_request() {
    let (status, _) = get_json(fallback_router(), "/market/BOND/XYZ").await;
    assert_eq!(status, 400);

    let (status, json) = get_json(fallback_router(), "/market/crypto/bitcoin").await;
    assert_eq!(status, 400);
    assert!(json["message"].as_str().unwrap().contains("CRYPTO"));
}

#[tokio::test]
async fn exhausted_chain_is_bad_gateway_with_last_provider() {
    let app = test_router(vec![
        FixedProvider {
            id: "PRIMARY",
            priority: 1,
            price: None,
        },
        FixedProvider {
            id: "SECONDARY",
            priority: 2,
            price: None,
        },
    ]);

    let (status, json) = get_json(app, "/market/STOCK/XXXX4.SA").await;

    assert_eq!(status, 502);
    assert_eq!(json["error"], "Bad Gateway");
    assert_eq!(json["provider"], "SECONDARY");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn health_lists_providers_in_fallback_order() {
    let (status, json) = get_json(fallback_router(), "/health").await;

    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["providers"], serde_json::json!(["PRIMARY", "SECONDARY"]));
}
