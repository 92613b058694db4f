//! Standalone video search endpoint

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use paparazzi_news::VideoSearch;
use tracing::error;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/videos/search", any(search_video))
}

/// ANY /api/videos/search - Top video hit for a query. The query comes from
/// a JSON body, a form body, or the query string, in that order.
async fn search_video(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let q = extract_query(&headers, &body, raw_query.as_deref());
    let Some(q) = q else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Missing q" })),
        )
            .into_response();
    };

    let videos = match &state.videos {
        Some(videos) => videos,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Video search not configured"
                })),
            )
                .into_response();
        }
    };

    match videos.search_first(&q).await {
        Ok(Some(hit)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "videoId": hit.video_id })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "Unable to find the video for news"
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Video search failed for '{}': {}", q, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Oops...something went wrong. Please check back later."
                })),
            )
                .into_response()
        }
    }
}

fn extract_query(headers: &HeaderMap, body: &str, raw_query: Option<&str>) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mut q = String::new();
    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(s) = value.get("q").and_then(|v| v.as_str()) {
                q = s.trim().to_string();
            }
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        q = url::form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default();
    }

    // Fall back to the query string when the body carried nothing
    if q.is_empty() {
        if let Some(raw) = raw_query {
            q = url::form_urlencoded::parse(raw.as_bytes())
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.trim().to_string())
                .unwrap_or_default();
        }
    }

    if q.is_empty() {
        None
    } else {
        Some(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn test_query_from_json_body() {
        let q = extract_query(
            &headers("application/json"),
            r#"{"q": " star video "}"#,
            None,
        );
        assert_eq!(q.as_deref(), Some("star video"));
    }

    #[test]
    fn test_query_from_form_body() {
        let q = extract_query(
            &headers("application/x-www-form-urlencoded"),
            "q=star+video&other=x",
            None,
        );
        assert_eq!(q.as_deref(), Some("star video"));
    }

    #[test]
    fn test_query_string_fallback() {
        let q = extract_query(&HeaderMap::new(), "", Some("q=from%20query"));
        assert_eq!(q.as_deref(), Some("from query"));
        assert!(extract_query(&HeaderMap::new(), "", None).is_none());
    }

    #[test]
    fn test_body_wins_over_query_string() {
        let q = extract_query(
            &headers("application/json"),
            r#"{"q": "from body"}"#,
            Some("q=from+query"),
        );
        assert_eq!(q.as_deref(), Some("from body"));
    }
}
