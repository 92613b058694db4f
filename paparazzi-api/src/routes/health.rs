//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    refresh_available: bool,
    push_available: bool,
    dedup_available: bool,
}

/// Health check handler. The server is healthy as long as it can serve the
/// stored feeds; missing optional services only degrade it.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let refresh_available = state.refresh.is_some();
    let status = if refresh_available { "healthy" } else { "degraded" };

    let response = HealthResponse {
        status: status.to_string(),
        refresh_available,
        push_available: state.push.is_some(),
        dedup_available: state.dedup.is_some(),
    };

    (StatusCode::OK, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
