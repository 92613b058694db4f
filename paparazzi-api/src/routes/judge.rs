//! Generic judge proxy endpoint
//!
//! Forwards a single system/user prompt pair to the chat-completions judge
//! backend. The caller supplies its own API key; this is a thin proxy, not a
//! metered service.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use paparazzi_news::judge::chat_completion;
use serde::Deserialize;
use tracing::error;

use crate::AppState;

const DEFAULT_JUDGE_MODEL: &str = "openai/gpt-oss-20b";

#[derive(Debug, Deserialize)]
pub struct JudgeRequest {
    pub system: String,
    pub user: String,
    pub api_key: String,
    pub model: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/judge", post(run_judge))
}

/// POST /api/judge - One chat completion, `{content}` back
async fn run_judge(
    State(state): State<AppState>,
    Json(request): Json<JudgeRequest>,
) -> impl IntoResponse {
    if request.api_key.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Invalid payload: requires 'system', 'user', 'api_key' strings"
            })),
        )
            .into_response();
    }

    let model = request
        .model
        .or_else(|| std::env::var("JUDGE_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string());

    match chat_completion(
        &state.http,
        &request.api_key,
        &model,
        &request.system,
        &request.user,
    )
    .await
    {
        Ok(content) => (
            StatusCode::OK,
            Json(serde_json::json!({ "content": content })),
        )
            .into_response(),
        Err(e) => {
            error!("Judge call failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
