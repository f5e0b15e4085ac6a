use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;

use crate::config::WebhookMode;
use crate::db::queries::OrderInsert;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{NewOrder, OrderItem, OrderStatus, default_checklist};
use crate::notify::NotifyEvent;
use crate::payments::{ProviderLineItem, SessionObject, SignatureError, StripeEvent, WebhookVerifier};

/// Payment provider callback. The signature is checked against the raw
/// body before anything is parsed; once an event passes that gate, the
/// provider gets a 200 ack unless we genuinely could not record the
/// order and want the delivery retried.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let mode = state.webhook_mode.clone().ok_or_else(|| {
        AppError::ServiceUnavailable("Webhook secret is not configured".into())
    })?;

    match &mode {
        WebhookMode::Verified(secret) => {
            let signature = headers
                .get("stripe-signature")
                .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".into()))?
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid stripe-signature header".into()))?;
            WebhookVerifier::new(secret.clone())
                .verify(&body, signature)
                .map_err(|e| match e {
                    SignatureError::Malformed => {
                        AppError::BadRequest("Malformed stripe-signature header".into())
                    }
                    SignatureError::Expired | SignatureError::Mismatch => {
                        AppError::Forbidden("Invalid webhook signature".into())
                    }
                })?;
        }
        WebhookMode::DevUnverified => {
            tracing::warn!("Accepting webhook event without signature verification");
        }
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse webhook event: {}", e);
        AppError::BadRequest("Invalid event payload".into())
    })?;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: SessionObject =
                serde_json::from_value(event.data.object).map_err(|e| {
                    tracing::error!("Failed to parse completed session payload: {}", e);
                    AppError::BadRequest("Invalid event payload".into())
                })?;
            process_completed_session(&state, session).await?;
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring webhook event");
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// Turns a completed checkout session into a paid order. Returns `Err`
/// only when the order could not be written at all, so the provider
/// retries the delivery; everything after the insert is best-effort.
async fn process_completed_session(state: &AppState, session: SessionObject) -> Result<()> {
    let conn = state.db.get()?;

    // Replay pre-check. A failed read is logged and ignored since the
    // unique index on payment_ref still catches duplicates at insert.
    match queries::get_order_by_payment_ref(&conn, &session.id) {
        Ok(Some(existing)) => {
            tracing::info!(order = %existing.id, session = %session.id, "Session already processed");
            return Ok(());
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Replay pre-check failed: {}", e);
        }
    }

    let stripe = state.stripe.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Payment provider credentials are not configured".into())
    })?;

    // Amounts come from the provider's own record of the session, never
    // from anything the client sent.
    let line_items = stripe.list_line_items(&session.id).await?;

    let Some(email) = session.email() else {
        tracing::error!(session = %session.id, "Completed session has no customer email, skipping");
        return Ok(());
    };
    let email = email.to_string();

    if line_items.is_empty() {
        tracing::error!(session = %session.id, "Completed session has no line items, skipping");
        return Ok(());
    }

    let items: Vec<OrderItem> = line_items.iter().map(ProviderLineItem::to_order_item).collect();
    let total_cents = session
        .amount_total
        .unwrap_or_else(|| items.iter().map(|i| i.price_cents * i.quantity).sum());

    let order = NewOrder {
        customer_name: session.customer_name(),
        email,
        total_cents,
        status: OrderStatus::Paid,
        items,
        date: queries::now(),
        payment_ref: Some(session.id.clone()),
        shipping_address: session.shipping_address(),
        checklist: default_checklist(),
        notes: None,
    };

    let order = match queries::create_order(&conn, &order)? {
        OrderInsert::Created(order) => order,
        OrderInsert::DuplicatePaymentRef => {
            tracing::info!(session = %session.id, "Session already processed by a concurrent delivery");
            return Ok(());
        }
    };

    if let Some(code) = session.promo_code() {
        match queries::increment_promotion_uses(&conn, code) {
            Ok(true) => tracing::info!(code = %code, "Promotion redeemed"),
            Ok(false) => tracing::warn!(code = %code, "Redeemed promotion not found"),
            Err(e) => tracing::error!(code = %code, "Failed to count promotion redemption: {}", e),
        }
    }

    let notified = state
        .notifier
        .notify(&NotifyEvent::Order {
            customer_name: order.customer_name.clone(),
            total: order.total_cents as f64 / 100.0,
            items: order.items.len(),
        })
        .await;
    if !notified {
        tracing::warn!(order = %order.id, "Order notification was not delivered");
    }

    tracing::info!(
        order = %order.id,
        session = %session.id,
        total_cents = order.total_cents,
        "Order recorded from completed checkout"
    );
    Ok(())
}
