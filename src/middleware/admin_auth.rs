use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::error::AppError;

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

fn secret_matches(expected: &str, headers: &HeaderMap) -> bool {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Gate for mutating admin endpoints, keyed on the `x-admin-secret`
/// header. A deployment without a configured secret accepts every
/// request; that open state is logged at startup and again here on
/// each use so it cannot pass unnoticed.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.admin_secret.as_deref() {
        Some(expected) => {
            if !secret_matches(expected, request.headers()) {
                return Err(AppError::Forbidden("Invalid admin secret".into()));
            }
        }
        None => {
            tracing::warn!(
                path = %request.uri().path(),
                "ADMIN_SECRET is not configured; accepting admin request unauthenticated"
            );
        }
    }
    Ok(next.run(request).await)
}
