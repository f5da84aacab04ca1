use crate::error::{AppError, AppResult};
use crate::models::{ResolveResponse, ShortenRequest, ShortenResponse};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use std::sync::Arc;

use super::AppState;

/// Shorten a URL
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ShortenRequest>,
) -> AppResult<impl IntoResponse> {
    let url = payload.url.as_deref().unwrap_or_default();
    let short_code = state.store.shorten(url).await?;

    Ok(Json(ShortenResponse { short_code }))
}

/// Look up the original URL for a short code (API variant)
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let original_url = state.store.resolve(&code).await?;

    Ok(Json(ResolveResponse { original_url }))
}

/// Resolve a short code and redirect to its original URL.
///
/// Unlike the API routes this endpoint answers in plain text on failure,
/// since it is what ends up in browsers following shared links.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.store.resolve(&code).await {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(AppError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "URL not found").into_response()
        }
        Err(e) => {
            tracing::error!(code = %code, "redirect lookup failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
        }
    }
}
