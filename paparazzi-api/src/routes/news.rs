//! News feed endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use paparazzi_core::Category;
use paparazzi_news::MAX_ITEMS_PER_CYCLE;
use paparazzi_services::ExpandEvent;
use serde::Deserialize;
use std::convert::Infallible;
use std::str::FromStr;
use tokio_stream::StreamExt;
use tracing::error;

use crate::AppState;

/// Query parameters for content expansion
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandQuery {
    pub person_name: String,
    pub news_title: String,
}

/// Create news routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/news/{category}", get(get_category_news))
        .route("/news/{category}/expand", get(expand_news))
}

/// GET /api/news/{category} - Latest records for one category
async fn get_category_news(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    let category = match Category::from_str(&category) {
        Ok(category) => category,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    match state.store.latest(category, MAX_ITEMS_PER_CYCLE) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Failed to load {} news: {}", category, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Failed to load news: {}", e)
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/news/{category}/expand - SSE stream of the elaborated story
async fn expand_news(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<ExpandQuery>,
) -> impl IntoResponse {
    let category = match Category::from_str(&category) {
        Ok(category) => category,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    let expander = match &state.expander {
        Some(expander) => expander,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Content expansion not configured"
                })),
            )
                .into_response();
        }
    };

    match expander
        .expand(category, &params.person_name, &params.news_title)
        .await
    {
        Ok(events) => Sse::new(sse_stream(events))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => {
            error!("Expansion failed for '{}': {}", params.news_title, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Expansion failed: {}", e)
                })),
            )
                .into_response()
        }
    }
}

fn sse_stream(
    events: impl Stream<Item = ExpandEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.map(|event| {
        let data = match event {
            ExpandEvent::Text(text) => serde_json::json!({ "text": text }),
            ExpandEvent::Done => serde_json::json!({ "done": true }),
            ExpandEvent::Error(message) => serde_json::json!({ "error": message }),
        };
        Ok(Event::default().data(data.to_string()))
    })
}
