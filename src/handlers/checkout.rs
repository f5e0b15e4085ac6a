use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cart::CartItemWire;
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::PromoKind;
use crate::payments::CheckoutLineItem;
use crate::pricing::{self, CentLine};
use crate::util::extract_client_ip;

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout-session", post(create_checkout_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    #[serde(default)]
    pub cart: Vec<CartItemWire>,
    #[serde(default)]
    pub promo: Option<PromoWire>,
    pub success_url: String,
    pub cancel_url: String,
}

/// The promotion as the storefront sends it. Only its shape is
/// validated here; redemption accounting happens against the stored
/// promotion when the payment webhook lands.
#[derive(Debug, Deserialize)]
pub struct PromoWire {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub redirect_url: String,
}

struct ValidatedPromo {
    code: String,
    kind: PromoKind,
    value: f64,
}

/// Largest unit price accepted on a cart line, in major units.
const MAX_ITEM_PRICE: f64 = 100_000.0;

/// Largest quantity accepted on a cart line.
const MAX_ITEM_QUANTITY: i64 = 1_000;

fn validate_cart(items: &[CartItemWire]) -> Result<()> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(AppError::BadRequest("Cart item name is required".into()));
        }
        if !item.price.is_finite() || item.price <= 0.0 {
            return Err(AppError::BadRequest(
                "Cart item price must be a positive number".into(),
            ));
        }
        if item.price > MAX_ITEM_PRICE {
            return Err(AppError::BadRequest(format!(
                "Cart item price must not exceed {MAX_ITEM_PRICE}"
            )));
        }
        if item.quantity < 1 {
            return Err(AppError::BadRequest(
                "Cart item quantity must be at least 1".into(),
            ));
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(AppError::BadRequest(format!(
                "Cart item quantity must not exceed {MAX_ITEM_QUANTITY}"
            )));
        }
        if let Some(image) = &item.image {
            let valid = Url::parse(image)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(AppError::BadRequest(
                    "Cart item image must be an absolute http(s) URL".into(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_promo(promo: &PromoWire) -> Result<ValidatedPromo> {
    if promo.code.trim().is_empty() {
        return Err(AppError::BadRequest("Promotion code is required".into()));
    }
    let kind: PromoKind = promo
        .kind
        .parse()
        .map_err(|_| AppError::BadRequest("Promotion type must be percent or fixed".into()))?;
    if !promo.value.is_finite() || promo.value < 0.0 {
        return Err(AppError::BadRequest(
            "Promotion value must be a non-negative number".into(),
        ));
    }
    Ok(ValidatedPromo {
        code: promo.code.trim().to_string(),
        kind,
        value: promo.value,
    })
}

fn validate_redirect(state: &AppState, url: &str, field: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|_| AppError::BadRequest(format!("Invalid {field} URL")))?;
    if !state.allowed_origins.allows_url(&parsed) {
        return Err(AppError::BadRequest(format!(
            "{field} URL origin is not allowed"
        )));
    }
    Ok(())
}

/// `POST /checkout-session`. Recomputes every amount server-side from
/// the submitted cart, then creates one provider session and returns
/// where to send the customer.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutSessionRequest>,
) -> Result<(StatusCode, Json<CheckoutSessionResponse>)> {
    let client_ip = extract_client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    if !state.rate_limiter.allow(&client_ip) {
        tracing::warn!(ip = %client_ip, "Checkout rate limit hit");
        return Err(AppError::RateLimited);
    }

    let stripe = state.stripe.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Payment provider credentials are not configured".into())
    })?;

    validate_cart(&request.cart)?;
    let promo = request.promo.as_ref().map(validate_promo).transpose()?;
    validate_redirect(&state, &request.success_url, "success")?;
    validate_redirect(&state, &request.cancel_url, "cancel")?;

    let lines: Vec<CentLine> = request
        .cart
        .iter()
        .map(|item| CentLine {
            unit_cents: pricing::to_cents(item.price),
            quantity: item.quantity,
        })
        .collect();
    let subtotal = pricing::subtotal_cents(&lines);
    let discount = promo
        .as_ref()
        .map(|p| pricing::discount_cents(p.kind, p.value, subtotal))
        .unwrap_or(0);
    let unit_amounts = pricing::distribute_discount(&lines, discount);

    let line_items: Vec<CheckoutLineItem> = request
        .cart
        .iter()
        .zip(unit_amounts)
        .map(|(item, unit_amount)| CheckoutLineItem {
            name: item.name.clone(),
            unit_amount,
            quantity: item.quantity,
            image: item.image.clone(),
        })
        .collect();

    let session = stripe
        .create_checkout_session(
            &line_items,
            &request.success_url,
            &request.cancel_url,
            promo.as_ref().map(|p| p.code.as_str()),
        )
        .await?;

    tracing::info!(
        session = %session.id,
        subtotal_cents = subtotal,
        discount_cents = discount,
        lines = line_items.len(),
        "Checkout session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutSessionResponse {
            session_id: session.id,
            redirect_url: session.url,
        }),
    ))
}
