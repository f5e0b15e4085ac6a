use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Router, middleware};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::require_admin;
use crate::models::{CreatePromotion, Promotion};

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/promotions", post(create_promotion))
        .route("/promotions/{id}", delete(delete_promotion))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/promotions", get(list_promotions))
        .merge(admin)
}

pub async fn list_promotions(State(state): State<AppState>) -> Result<Json<Vec<Promotion>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_promotions(&conn)?))
}

pub async fn create_promotion(
    State(state): State<AppState>,
    Json(request): Json<CreatePromotion>,
) -> Result<(StatusCode, Json<Vec<Promotion>>)> {
    let code = request.code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("Promotion code is required".into()));
    }
    if !request.value.is_finite() || request.value < 0.0 {
        return Err(AppError::BadRequest(
            "Promotion value must be a non-negative number".into(),
        ));
    }

    let conn = state.db.get()?;
    queries::create_promotion(
        &conn,
        &CreatePromotion {
            code,
            kind: request.kind,
            value: request.value,
        },
    )?;
    Ok((StatusCode::CREATED, Json(queries::list_promotions(&conn)?)))
}

pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Promotion>>> {
    let conn = state.db.get()?;
    if !queries::delete_promotion(&conn, &id)? {
        return Err(AppError::NotFound("Promotion not found".into()));
    }
    Ok(Json(queries::list_promotions(&conn)?))
}
