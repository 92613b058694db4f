//! Wikimedia Commons image search
//!
//! Returns candidate image URLs for a person. Transient failures (rate
//! limits, blocks, upstream errors) are retried with backoff and jitter;
//! other client errors are permanent and surface immediately so the resolver
//! can fall back.

use async_trait::async_trait;
use paparazzi_core::{PaparazziError, PaparazziResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::backoff::{backoff_delay, is_retryable_status};
use crate::traits::ImageSearch;

const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

const SEARCH_ATTEMPTS: u32 = 5;
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WikimediaClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CommonsResponse {
    query: Option<CommonsQuery>,
}

#[derive(Debug, Deserialize)]
struct CommonsQuery {
    #[serde(default)]
    pages: HashMap<String, CommonsPage>,
}

#[derive(Debug, Deserialize)]
struct CommonsPage {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    imageinfo: Vec<CommonsImageInfo>,
}

#[derive(Debug, Deserialize)]
struct CommonsImageInfo {
    #[serde(default)]
    thumburl: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl WikimediaClient {
    pub fn new() -> PaparazziResult<Self> {
        let client = Client::builder()
            .user_agent("paparazzi-terminal/0.1")
            .build()
            .map_err(|e| PaparazziError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn search_once(&self, query: &str) -> PaparazziResult<Vec<String>> {
        let response = self
            .client
            .get(COMMONS_API)
            .query(&[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrnamespace", "6"),
                ("gsrlimit", "15"),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("iiurlwidth", "800"),
                ("format", "json"),
                ("origin", "*"),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| PaparazziError::network(format!("Commons request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let err = PaparazziError::api(format!("Commons API returned {}", status));
            return if is_retryable_status(status) {
                Err(err)
            } else {
                // Permanent client error; no point retrying
                Err(PaparazziError::NotFound(err.to_string()))
            };
        }

        let parsed: CommonsResponse = response
            .json()
            .await
            .map_err(|e| PaparazziError::parse(format!("Failed to parse Commons response: {}", e)))?;

        let candidates = candidates_in_rank_order(parsed);
        debug!("Commons search '{}' returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}

/// Flatten a Commons response into candidate URLs, best match first. Search
/// relevance order is carried by the page index field, not the map order.
fn candidates_in_rank_order(parsed: CommonsResponse) -> Vec<String> {
    let mut pages: Vec<CommonsPage> = parsed
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|p| p.index.unwrap_or(i64::MAX));

    pages
        .into_iter()
        .filter_map(|page| {
            let info = page.imageinfo.into_iter().next()?;
            info.thumburl.or(info.url)
        })
        .collect()
}

#[async_trait]
impl ImageSearch for WikimediaClient {
    #[instrument(skip(self))]
    async fn search_images(&self, query: &str) -> PaparazziResult<Vec<String>> {
        let mut last_err = PaparazziError::internal("search not attempted");
        for attempt in 1..=SEARCH_ATTEMPTS {
            match self.search_once(query).await {
                Ok(candidates) => return Ok(candidates),
                // Permanent client error, give up so the caller falls back
                Err(e @ PaparazziError::NotFound(_)) => return Err(e),
                Err(e) => {
                    last_err = e;
                    if attempt < SEARCH_ATTEMPTS {
                        let delay = backoff_delay(attempt, Duration::from_millis(500));
                        warn!(
                            "Commons search attempt {}/{} failed ({}), retrying in {:?}",
                            attempt, SEARCH_ATTEMPTS, last_err, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err)
    }
}

/// Reject document formats; accept common raster/vector formats and
/// Wikimedia thumbnail-path URLs that lack an extension.
pub fn is_usable_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if lower.contains(".pdf") {
        return false;
    }
    for ext in [".doc", ".docx", ".txt", ".odt", ".rtf"] {
        if lower.contains(ext) {
            return false;
        }
    }
    for ext in [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"] {
        if let Some(idx) = lower.find(ext) {
            let rest = &lower[idx + ext.len()..];
            if rest.is_empty() || rest.starts_with('?') {
                return true;
            }
        }
    }
    lower.contains("/thumb/")
}

/// Soft match: does the URL's filename contain at least one token of the
/// person's name (tokens shorter than 3 chars are ignored)?
pub fn filename_has_name_token(url: &str, person_name: &str) -> bool {
    let filename = url.to_lowercase();
    person_name
        .to_lowercase()
        .split_whitespace()
        .filter(|part| part.len() > 2)
        .any(|part| filename.contains(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_documents() {
        assert!(!is_usable_image_url("https://upload.wikimedia.org/a/b/Resume.pdf"));
        assert!(!is_usable_image_url("https://example.com/files/notes.docx"));
        assert!(!is_usable_image_url("https://example.com/readme.txt"));
    }

    #[test]
    fn test_accepts_images_and_thumbs() {
        assert!(is_usable_image_url("https://upload.wikimedia.org/a/b/Person.jpg"));
        assert!(is_usable_image_url("https://upload.wikimedia.org/a/b/Logo.svg?download"));
        assert!(is_usable_image_url(
            "https://upload.wikimedia.org/wikipedia/commons/thumb/a/b/Person/800px-Person"
        ));
        assert!(!is_usable_image_url("https://example.com/page.html"));
    }

    #[test]
    fn test_filename_name_token() {
        assert!(filename_has_name_token(
            "https://upload.wikimedia.org/thumb/Deepika_Padukone_2019.jpg",
            "Deepika Padukone"
        ));
        assert!(!filename_has_name_token(
            "https://upload.wikimedia.org/thumb/Red_carpet_crowd.jpg",
            "Deepika Padukone"
        ));
        // Short tokens are ignored
        assert!(!filename_has_name_token(
            "https://example.com/to_the_top.jpg",
            "M J"
        ));
    }

    #[test]
    fn test_candidates_sorted_by_index_with_thumb_preference() {
        let raw = r#"{"query":{"pages":{
            "10":{"index":2,"imageinfo":[{"url":"https://u.w.org/b.jpg"}]},
            "11":{"index":1,"imageinfo":[{"thumburl":"https://u.w.org/thumb/a.jpg","url":"https://u.w.org/a.jpg"}]},
            "12":{"imageinfo":[]}
        }}}"#;
        let parsed: CommonsResponse = serde_json::from_str(raw).unwrap();
        let candidates = candidates_in_rank_order(parsed);
        assert_eq!(
            candidates,
            vec![
                "https://u.w.org/thumb/a.jpg".to_string(),
                "https://u.w.org/b.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidates_empty_without_query() {
        let parsed: CommonsResponse = serde_json::from_str("{}").unwrap();
        assert!(candidates_in_rank_order(parsed).is_empty());
    }
}
