//! Authorization-header token gate for the /api routes
//!
//! Runs before any core logic: requests without a known token never reach
//! ingestion or query handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::server::AppState;

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized("Authorization token missing");
    };

    let known = { state.store.lock().await.token_exists(&token) };
    match known {
        Ok(true) => next.run(request).await,
        Ok(false) => unauthorized("Invalid or expired token"),
        Err(e) => {
            tracing::error!("Token lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "token lookup failed" })),
            )
                .into_response()
        }
    }
}
