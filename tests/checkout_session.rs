//! Tests for POST /checkout-session: validation, origin checks, rate
//! limiting, and the amounts actually submitted to the provider.

use std::sync::Arc;

use axum::http::StatusCode;
use rustikop::rate_limit::InMemoryRateLimiter;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::*;

fn checkout_body(cart: serde_json::Value, promo: Option<serde_json::Value>) -> serde_json::Value {
    let mut body = json!({
        "cart": cart,
        "successUrl": format!("{TEST_ORIGIN}/merci"),
        "cancelUrl": format!("{TEST_ORIGIN}/panier"),
    });
    if let Some(promo) = promo {
        body["promo"] = promo;
    }
    body
}

async fn mock_session_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": "https://checkout.stripe.com/c/pay/cs_test_123"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let server = MockServer::start().await;
    let app = rustikop::app(with_stripe(test_state(), &server.uri()));

    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(json!([]), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
async fn test_invalid_items_are_rejected() {
    let server = MockServer::start().await;
    let state = with_stripe(test_state(), &server.uri());

    let bad_carts = [
        json!([{ "name": "  ", "price": 10.0, "quantity": 1 }]),
        json!([{ "name": "Poster", "price": 0.0, "quantity": 1 }]),
        json!([{ "name": "Poster", "price": -4.0, "quantity": 1 }]),
        json!([{ "name": "Poster", "price": 10.0, "quantity": 0 }]),
        json!([{ "name": "Poster", "price": 1.0e17, "quantity": 2 }]),
        json!([{ "name": "Poster", "price": 10.0, "quantity": 100000 }]),
        json!([{ "name": "Poster", "price": 10.0, "quantity": 1, "image": "poster.jpg" }]),
        json!([{ "name": "Poster", "price": 10.0, "quantity": 1, "image": "javascript:alert(1)" }]),
    ];
    for cart in bad_carts {
        let app = rustikop::app(state.clone());
        let response =
            send_json(app, "POST", "/checkout-session", checkout_body(cart, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_invalid_promo_is_rejected() {
    let server = MockServer::start().await;
    let state = with_stripe(test_state(), &server.uri());
    let cart = json!([{ "name": "Poster", "price": 10.0, "quantity": 1 }]);

    let bad_promos = [
        json!({ "code": "", "type": "percent", "value": 10.0 }),
        json!({ "code": "SAVE", "type": "bogo", "value": 10.0 }),
        json!({ "code": "SAVE", "type": "fixed", "value": -2.0 }),
    ];
    for promo in bad_promos {
        let app = rustikop::app(state.clone());
        let response = send_json(
            app,
            "POST",
            "/checkout-session",
            checkout_body(cart.clone(), Some(promo)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_redirect_urls_must_match_allowed_origins() {
    let server = MockServer::start().await;
    let state = with_stripe(test_state(), &server.uri());

    let app = rustikop::app(state.clone());
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        json!({
            "cart": [{ "name": "Poster", "price": 10.0, "quantity": 1 }],
            "successUrl": "https://evil.example.com/merci",
            "cancelUrl": format!("{TEST_ORIGIN}/panier"),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = rustikop::app(state);
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        json!({
            "cart": [{ "name": "Poster", "price": 10.0, "quantity": 1 }],
            "successUrl": format!("{TEST_ORIGIN}/merci"),
            "cancelUrl": "not a url",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_provider_credentials_return_500() {
    let app = rustikop::app(test_state());
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(json!([{ "name": "Poster", "price": 10.0, "quantity": 1 }]), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Service unavailable");
}

#[tokio::test]
async fn test_session_created_with_discounted_amounts() {
    let server = MockServer::start().await;
    mock_session_endpoint(&server).await;
    let app = rustikop::app(with_stripe(test_state(), &server.uri()));

    // 2 x 10€ + 1 x 5€ with a fixed 5€ promo: the walk takes the whole
    // discount from the first line, leaving units of 750 and 500.
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(
            json!([
                { "name": "Poster", "price": 10.0, "quantity": 2 },
                { "name": "Mug", "price": 5.0, "quantity": 1 }
            ]),
            Some(json!({ "code": "SAVE5", "type": "fixed", "value": 5.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["sessionId"], "cs_test_123");
    assert_eq!(
        body["redirectUrl"],
        "https://checkout.stripe.com/c/pay/cs_test_123"
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(form.contains("mode=payment"));
    assert!(form.contains("currency%5D=eur"));
    assert!(form.contains("unit_amount%5D=750"), "form was: {form}");
    assert!(form.contains("unit_amount%5D=500"), "form was: {form}");
    assert!(form.contains("promo_code%5D=SAVE5"));
}

#[tokio::test]
async fn test_percent_discount_rounds_per_line() {
    let server = MockServer::start().await;
    mock_session_endpoint(&server).await;
    let app = rustikop::app(with_stripe(test_state(), &server.uri()));

    // 3 x 10€ minus 10% is 2700 over the line, 900 per unit.
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(
            json!([{ "name": "Poster", "price": 10.0, "quantity": 3 }]),
            Some(json!({ "code": "TEN", "type": "percent", "value": 10.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let form = String::from_utf8(server.received_requests().await.unwrap()[0].body.clone()).unwrap();
    assert!(form.contains("unit_amount%5D=900"), "form was: {form}");
}

#[tokio::test]
async fn test_fixed_discount_floors_the_unit_amount() {
    let server = MockServer::start().await;
    mock_session_endpoint(&server).await;
    let app = rustikop::app(with_stripe(test_state(), &server.uri()));

    // 3 x 10€ minus 1€ is 2900 over the line; 2900 / 3 floors to 966,
    // so the session collects 2898.
    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(
            json!([{ "name": "Poster", "price": 10.0, "quantity": 3 }]),
            Some(json!({ "code": "ONEOFF", "type": "fixed", "value": 1.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let form = String::from_utf8(server.received_requests().await.unwrap()[0].body.clone()).unwrap();
    assert!(form.contains("unit_amount%5D=966"), "form was: {form}");
}

#[tokio::test]
async fn test_no_promo_sends_none_sentinel() {
    let server = MockServer::start().await;
    mock_session_endpoint(&server).await;
    let app = rustikop::app(with_stripe(test_state(), &server.uri()));

    let response = send_json(
        app,
        "POST",
        "/checkout-session",
        checkout_body(json!([{ "name": "Poster", "price": 10.0, "quantity": 1 }]), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let form = String::from_utf8(server.received_requests().await.unwrap()[0].body.clone()).unwrap();
    assert!(form.contains("promo_code%5D=none"));
    assert!(form.contains("unit_amount%5D=1000"));
}

#[tokio::test]
async fn test_rate_limit_returns_429_after_burst() {
    let mut state = test_state();
    state.rate_limiter = Arc::new(InMemoryRateLimiter::new(20));
    let state = state;

    // No provider configured, so allowed requests come back as 500.
    // The limiter is keyed per client and consulted first.
    let body = checkout_body(json!([{ "name": "Poster", "price": 10.0, "quantity": 1 }]), None);
    for _ in 0..20 {
        let app = rustikop::app(state.clone());
        let response = send_json(app, "POST", "/checkout-session", body.clone()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let app = rustikop::app(state.clone());
    let response = send_json(app, "POST", "/checkout-session", body.clone()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let error = body_json(response).await;
    assert_eq!(error["error"], "Too many requests");

    // A different client address is not affected.
    let app = rustikop::app(state);
    let response = send_json_with_headers(
        app,
        "POST",
        "/checkout-session",
        &[("x-forwarded-for", "203.0.113.9")],
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
