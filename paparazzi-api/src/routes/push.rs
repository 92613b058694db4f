//! Push subscription and broadcast endpoints

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use chrono::Utc;
use paparazzi_core::PushSubscription;
use serde::Deserialize;
use tracing::error;

use crate::AppState;

/// Subscription payload in standard Push API shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub subscription: BrowserSubscription,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrowserSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/push/subscribe", post(subscribe))
        .route("/push/broadcast", post(broadcast))
}

/// POST /api/push/subscribe - Register or refresh a push subscription
async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> impl IntoResponse {
    let push = match &state.push {
        Some(push) => push,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Push delivery not configured"
                })),
            )
                .into_response();
        }
    };

    if request.subscription.endpoint.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Missing endpoint" })),
        )
            .into_response();
    }

    let subscription = PushSubscription {
        endpoint: request.subscription.endpoint,
        p256dh: request.subscription.keys.p256dh,
        auth: request.subscription.keys.auth,
        user_agent: request.user_agent,
        created_at: Utc::now(),
    };

    match push.subscribe(subscription) {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => {
            error!("Failed to store subscription: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Failed to store subscription: {}", e)
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/push/broadcast - Send the digest to every subscriber
async fn broadcast(State(state): State<AppState>) -> impl IntoResponse {
    let push = match &state.push {
        Some(push) => push,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Push delivery not configured"
                })),
            )
                .into_response();
        }
    };

    match push.broadcast_digest().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!("Broadcast failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Broadcast failed: {}", e)
                })),
            )
                .into_response()
        }
    }
}
