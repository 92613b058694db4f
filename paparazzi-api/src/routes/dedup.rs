//! Dedup sweep endpoint

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use chrono::Utc;
use tracing::info;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dedup", post(trigger_sweep))
}

/// POST /api/dedup - Run the duplicate sweep across all categories
async fn trigger_sweep(State(state): State<AppState>) -> impl IntoResponse {
    let dedup = match &state.dedup {
        Some(dedup) => dedup,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Dedup sweep not configured"
                })),
            )
                .into_response();
        }
    };

    info!("Dedup sweep triggered");
    let results = dedup.sweep_all().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Dedup sweep completed",
            "results": results,
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}
