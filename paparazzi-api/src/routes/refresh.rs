//! Refresh trigger endpoint

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::any, Json, Router,
};
use tracing::info;

use crate::AppState;

/// Create refresh routes. The external scheduler is not picky about the
/// method it uses, so any method triggers the cycle.
pub fn routes() -> Router<AppState> {
    Router::new().route("/refresh", any(trigger_refresh))
}

/// ANY /api/refresh - Run the full refresh cycle for every category
async fn trigger_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let refresh = match &state.refresh {
        Some(refresh) => refresh,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Refresh pipeline not configured"
                })),
            )
                .into_response();
        }
    };

    info!("Refresh triggered");
    let summary = refresh.refresh_all().await;
    (StatusCode::OK, Json(summary)).into_response()
}
