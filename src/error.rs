use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("URL required")]
    InvalidInput,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Short code not found: {0}")]
    NotFound(String),

    #[error("Short code already taken: {0}")]
    CodeCollision(String),

    #[error("Short code allocation exhausted after {0} attempts")]
    AllocationExhausted(u32),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment variable missing: {0}")]
    MissingEnvVar(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError to HTTP response.
///
/// Validation failures carry a specific message; everything else collapses
/// to a generic server error so no internal detail leaks to the caller.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidInput => (StatusCode::BAD_REQUEST, "URL required"),
            AppError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "Invalid URL"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            AppError::AllocationExhausted(attempts) => {
                tracing::error!(attempts, "short code allocation exhausted");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            // Collisions are retried inside the store's allocation loop; one
            // escaping here means the retry budget was bypassed.
            AppError::CodeCollision(code) => {
                tracing::error!(code = %code, "unretried short code collision");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            _ => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        let body = json!({
            "error": error_message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for AppResult
pub type AppResult<T> = Result<T, AppError>;
