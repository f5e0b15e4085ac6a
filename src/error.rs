use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    /// A required credential or collaborator is not configured; the endpoint
    /// that depends on it degrades instead of the whole process crashing.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Payment provider or another upstream call failed.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_)
            | AppError::Upstream(_)
            | AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. 5xx detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::ServiceUnavailable(_) => "Service unavailable".to_string(),
            AppError::Upstream(_) => "Payment service error".to_string(),
            AppError::Internal(_) | AppError::Database(_) | AppError::Pool(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
