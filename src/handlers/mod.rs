use axum::Router;
use axum::routing::get;
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

pub mod checkout;
pub mod orders;
pub mod promotions;
pub mod webhooks;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(checkout::router())
        .merge(webhooks::router())
        .merge(orders::router(state.clone()))
        .merge(promotions::router(state))
}
