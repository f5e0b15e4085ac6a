pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod payments;
pub mod pricing;
pub mod rate_limit;
pub mod util;

use axum::Router;
use axum::http::{HeaderName, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::AppState;
use crate::middleware::admin_auth::ADMIN_SECRET_HEADER;

/// Assembles the full application: routes, CORS, and request tracing.
pub fn app(state: AppState) -> Router {
    let origins = state.allowed_origins.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .map(|o| origins.allows_origin_str(o))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_SECRET_HEADER),
        ]);

    handlers::router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
