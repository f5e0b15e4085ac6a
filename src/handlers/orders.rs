use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::require_admin;
use crate::models::{
    CreateOrderRequest, NewOrder, OrderItem, OrderResponse, OrderStatus, UpdateOrderRequest,
    default_checklist,
};
use crate::pricing;

/// Reads are open so the dashboard can render without a session; every
/// write goes through the admin-secret gate.
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", put(update_order))
        .route("/orders/{id}", delete(delete_order))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new().route("/orders", get(list_orders)).merge(admin)
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<OrderResponse>>> {
    let conn = state.db.get()?;
    let orders = queries::list_orders(&conn)?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// Manual entry from the dashboard, e.g. commissions agreed over email.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Vec<OrderResponse>>)> {
    if request.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("Customer name is required".into()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::BadRequest("Customer email is required".into()));
    }
    if !request.total.is_finite() || request.total < 0.0 {
        return Err(AppError::BadRequest(
            "Order total must be a non-negative number".into(),
        ));
    }
    for item in &request.items {
        if item.name.trim().is_empty() {
            return Err(AppError::BadRequest("Order item name is required".into()));
        }
        if item.quantity < 1 {
            return Err(AppError::BadRequest(
                "Order item quantity must be at least 1".into(),
            ));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(AppError::BadRequest(
                "Order item price must be a non-negative number".into(),
            ));
        }
    }

    let order = NewOrder {
        customer_name: request.customer_name.trim().to_string(),
        email: request.email.trim().to_string(),
        total_cents: pricing::to_cents(request.total),
        status: request.status.unwrap_or(OrderStatus::Received),
        items: request
            .items
            .iter()
            .map(|item| OrderItem {
                name: item.name.trim().to_string(),
                quantity: item.quantity,
                price_cents: pricing::to_cents(item.price),
            })
            .collect(),
        date: queries::now(),
        payment_ref: None,
        shipping_address: request.shipping_address,
        checklist: default_checklist(),
        notes: request.notes,
    };

    let conn = state.db.get()?;
    queries::create_order(&conn, &order)?;
    let orders = queries::list_orders(&conn)?;
    Ok((
        StatusCode::CREATED,
        Json(orders.into_iter().map(OrderResponse::from).collect()),
    ))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Vec<OrderResponse>>> {
    let conn = state.db.get()?;
    if queries::get_order_by_id(&conn, &id)?.is_none() {
        return Err(AppError::NotFound("Order not found".into()));
    }
    queries::update_order(&conn, &id, &request)?;
    let orders = queries::list_orders(&conn)?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>> {
    let conn = state.db.get()?;
    if !queries::delete_order(&conn, &id)? {
        return Err(AppError::NotFound("Order not found".into()));
    }
    let orders = queries::list_orders(&conn)?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
