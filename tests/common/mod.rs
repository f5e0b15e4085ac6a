//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use hmac::{Hmac, Mac};
use r2d2_sqlite::SqliteConnectionManager;
use sha2::Sha256;
use tower::ServiceExt;

use rustikop::config::{AllowedOrigins, WebhookMode};
use rustikop::db::{AppState, init_schema, queries};
use rustikop::models::{CreatePromotion, PromoKind, Promotion};
use rustikop::notify::Notifier;
use rustikop::payments::StripeClient;
use rustikop::rate_limit::InMemoryRateLimiter;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_ADMIN_SECRET: &str = "studio-admin-secret";
pub const TEST_ORIGIN: &str = "https://www.rustikop.com";

/// A fully wired state over a fresh in-memory database. No payment
/// provider is attached; tests that need one point a client at a mock
/// server with [`with_stripe`].
pub fn test_state() -> AppState {
    // One connection only: every pooled :memory: connection would get
    // its own private database.
    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_schema(&conn).unwrap();
    }

    AppState {
        db: pool,
        stripe: None,
        webhook_mode: Some(WebhookMode::Verified(TEST_WEBHOOK_SECRET.to_string())),
        notifier: Notifier::new(None),
        rate_limiter: Arc::new(InMemoryRateLimiter::new(1000)),
        admin_secret: Some(TEST_ADMIN_SECRET.to_string()),
        allowed_origins: AllowedOrigins::from_env_list(TEST_ORIGIN, false),
    }
}

pub fn with_stripe(mut state: AppState, api_base: &str) -> AppState {
    state.stripe = Some(StripeClient::with_base("sk_test_key", api_base));
    state
}

pub fn seed_promotion(state: &AppState, code: &str, kind: PromoKind, value: f64) -> Promotion {
    let conn = state.db.get().unwrap();
    queries::create_promotion(
        &conn,
        &CreatePromotion {
            code: code.to_string(),
            kind,
            value,
        },
    )
    .unwrap()
}

/// `stripe-signature` header value for `payload`, timestamped now.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    sign_payload_at(secret, payload, chrono::Utc::now().timestamp())
}

pub fn sign_payload_at(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// A `checkout.session.completed` event body as the provider sends it.
pub fn completed_session_event(
    session_id: &str,
    email: Option<&str>,
    promo_code: Option<&str>,
    amount_total: i64,
) -> serde_json::Value {
    serde_json::json!({
        "id": format!("evt_{session_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": amount_total,
                "customer_details": { "email": email, "name": "Maud Lenoir" },
                "shipping_details": {
                    "name": "Maud Lenoir",
                    "address": {
                        "line1": "12 rue des Ateliers",
                        "city": "Lyon",
                        "postal_code": "69001",
                        "country": "FR"
                    }
                },
                "metadata": { "promo_code": promo_code.unwrap_or("none") }
            }
        }
    })
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn send_json(app: Router, method: &str, uri: &str, body: serde_json::Value) -> Response {
    send_json_with_headers(app, method, uri, &[], body).await
}

pub async fn send_json_with_headers(
    app: Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: serde_json::Value,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn send_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
