//! YouTube search client
//!
//! Fetches only the single top hit for a query. The matcher layered on top
//! decides whether that hit is actually about the headline.

use async_trait::async_trait;
use paparazzi_core::{PaparazziError, PaparazziResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::traits::{VideoHit, VideoSearch};

const YOUTUBE_SEARCH_API: &str = "https://www.googleapis.com/youtube/v3/search";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> PaparazziResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PaparazziError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> PaparazziResult<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| PaparazziError::config("YOUTUBE_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }
}

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", urlencoding::encode(video_id))
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    #[instrument(skip(self))]
    async fn search_first(&self, query: &str) -> PaparazziResult<Option<VideoHit>> {
        let response = self
            .client
            .get(YOUTUBE_SEARCH_API)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("q", query),
                ("key", &self.api_key),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| PaparazziError::network(format!("YouTube request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PaparazziError::api(format!(
                "YouTube API returned {}",
                status
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| PaparazziError::parse(format!("Failed to parse YouTube response: {}", e)))?;

        let hit = parsed.items.into_iter().next().and_then(|item| {
            let video_id = item.id.and_then(|id| id.video_id)?;
            let title = item.snippet.map(|s| s.title).unwrap_or_default();
            Some(VideoHit { video_id, title })
        });

        debug!("YouTube search '{}' hit: {:?}", query, hit.is_some());
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url("abc123XYZ"),
            "https://www.youtube.com/watch?v=abc123XYZ"
        );
    }

    #[test]
    fn test_parse_search_response() {
        let raw = r#"{"items":[{"id":{"videoId":"xyz"},"snippet":{"title":"A title"}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.items[0].id.as_ref().unwrap().video_id.as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_parse_empty_response() {
        let parsed: SearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.items.is_empty());
    }
}
