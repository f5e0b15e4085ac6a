use axum::Router;
use axum::routing::post;

use crate::db::AppState;

mod stripe;

pub use stripe::handle_stripe_webhook;

pub fn router() -> Router<AppState> {
    Router::new().route("/payment-webhook", post(handle_stripe_webhook))
}
