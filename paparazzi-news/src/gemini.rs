//! Generation API client (Gemini-style REST)
//!
//! One-shot generation drives the refresh pipeline; streamed generation
//! drives the content expansion endpoint. The API key is either configured
//! directly or resolved per category from a lookup endpoint.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use paparazzi_core::{Category, PaparazziError, PaparazziResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};

use crate::backoff::{backoff_delay, is_retryable_status};
use crate::traits::NewsGenerator;

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
const STREAM_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse";

/// Retry policy for the one-shot generation call: fixed delay, small cap.
/// The generation call is the one remote whose exhaustion fails the cycle.
const GENERATE_ATTEMPTS: u32 = 3;
const GENERATE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Key lookups are cheap; retried with backoff like the search calls
const KEY_LOOKUP_ATTEMPTS: u32 = 5;
const KEY_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Stream establishment gets a generous timeout; chunks arrive after
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Where the generation API key comes from
#[derive(Debug, Clone)]
enum KeySource {
    /// Single key shared by all categories
    Direct(String),
    /// Per-category lookup endpoint returning the key
    Lookup(String),
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    key_source: KeySource,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    tools: Vec<serde_json::Value>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct KeyLookupResponse {
    key: String,
}

impl GeminiClient {
    /// Build from environment. `GEMINI_API_KEY` wins; `GEMINI_KEY_URL` is the
    /// per-category lookup fallback. Neither set is a configuration error.
    pub fn from_env() -> PaparazziResult<Self> {
        let key_source = if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            KeySource::Direct(key)
        } else if let Ok(url) = std::env::var("GEMINI_KEY_URL") {
            KeySource::Lookup(url)
        } else {
            return Err(PaparazziError::config(
                "GEMINI_API_KEY or GEMINI_KEY_URL must be set",
            ));
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PaparazziError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, key_source })
    }

    /// Resolve the API key for a category, retrying lookup failures with
    /// backoff and jitter.
    async fn api_key(&self, category: Category) -> PaparazziResult<String> {
        let lookup_url = match &self.key_source {
            KeySource::Direct(key) => return Ok(key.clone()),
            KeySource::Lookup(url) => url.clone(),
        };

        let mut last_err = PaparazziError::config("key lookup not attempted");
        for attempt in 1..=KEY_LOOKUP_ATTEMPTS {
            let result = self
                .client
                .get(&lookup_url)
                .query(&[("category", category.slug())])
                .timeout(KEY_LOOKUP_TIMEOUT)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await.map_err(|e| {
                        PaparazziError::network(format!("Key lookup read failed: {}", e))
                    })?;
                    // The lookup endpoint answers `{"key": "..."}` or a bare key
                    let key = match serde_json::from_str::<KeyLookupResponse>(&body) {
                        Ok(parsed) => parsed.key,
                        Err(_) => body.trim().to_string(),
                    };
                    if key.is_empty() {
                        return Err(PaparazziError::config("Key lookup returned empty key"));
                    }
                    return Ok(key);
                }
                Ok(response) if is_retryable_status(response.status()) => {
                    last_err = PaparazziError::api(format!(
                        "Key lookup returned {}",
                        response.status()
                    ));
                }
                Ok(response) => {
                    return Err(PaparazziError::api(format!(
                        "Key lookup returned {}",
                        response.status()
                    )));
                }
                Err(e) => {
                    last_err = PaparazziError::network(format!("Key lookup failed: {}", e));
                }
            }

            if attempt < KEY_LOOKUP_ATTEMPTS {
                let delay = backoff_delay(attempt, Duration::from_millis(500));
                warn!(
                    "Key lookup attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, KEY_LOOKUP_ATTEMPTS, last_err, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_err)
    }

    fn listing_prompt(category: Category) -> String {
        let (audience, example) = match category {
            Category::Bollywood => (
                "Indian Bollywood actors and singers",
                "Shah Rukh Khan - Announces new collaboration with international director\n\
                 Deepika Padukone - Wins Best Actress award at film festival",
            ),
            Category::Tv => (
                "Indian daily soap and TV industry actors",
                "Hina Khan - Returns to popular TV show after break\n\
                 Rupali Ganguly - Show reaches 1000 episode milestone",
            ),
            Category::Hollywood => (
                "American Hollywood actors and singers",
                "Leonardo DiCaprio - Signs for climate change documentary\n\
                 Taylor Swift - Announces surprise album release",
            ),
        };
        format!(
            "Using ONLY real-time web results get exactly 15 latest entertainment news items \
             about {audience} trending from the past 24 hours. Each news item must be on a \
             separate line in this exact format:\n\
             [Person Name] - [Single line news description]\n\n\
             Example:\n{example}\n\n\
             Requirements:\n\
             - Use real, well-known celebrities\n\
             - Keep each news item to one line\n\
             - Make news current and tabloid worthy\n\
             - Return exactly 15 items"
        )
    }

    fn elaboration_prompt(category: Category, person_name: &str, news_title: &str) -> String {
        format!(
            "Generate a comprehensive text summary of the given news regarding the provided \
             celebrity. Provide the latest available contents through search. {} {} - {}",
            category.display_name(),
            person_name,
            news_title
        )
    }

    async fn post_generate(&self, key: &str, prompt: String) -> PaparazziResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            tools: vec![serde_json::json!({ "google_search": {} })],
            generation_config: Some(GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 2048,
            }),
        };

        let response = self
            .client
            .post(GENERATE_URL)
            .query(&[("key", key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| PaparazziError::network(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaparazziError::api(format!(
                "Generation API error ({}): {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PaparazziError::parse(format!("Failed to parse generation response: {}", e)))?;

        Ok(extract_text(&parsed))
    }
}

fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Pull the text chunk out of one SSE `data:` line, if it carries one
fn sse_chunk_text(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let parsed: GenerateResponse = serde_json::from_str(payload.trim()).ok()?;
    let text = extract_text(&parsed);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl NewsGenerator for GeminiClient {
    #[instrument(skip(self))]
    async fn generate(&self, category: Category) -> PaparazziResult<String> {
        let key = self.api_key(category).await?;
        let prompt = Self::listing_prompt(category);

        let mut last_err = PaparazziError::internal("generation not attempted");
        for attempt in 1..=GENERATE_ATTEMPTS {
            match self.post_generate(&key, prompt.clone()).await {
                Ok(text) => {
                    debug!("Generated {} chars for {}", text.len(), category);
                    return Ok(text);
                }
                Err(e) => {
                    last_err = e;
                    if attempt < GENERATE_ATTEMPTS {
                        warn!(
                            "Generation attempt {}/{} for {} failed: {}. Retrying in {:?}",
                            attempt, GENERATE_ATTEMPTS, category, last_err, GENERATE_RETRY_DELAY
                        );
                        tokio::time::sleep(GENERATE_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    #[instrument(skip(self))]
    async fn stream_elaboration(
        &self,
        category: Category,
        person_name: &str,
        news_title: &str,
    ) -> PaparazziResult<BoxStream<'static, PaparazziResult<String>>> {
        let key = self.api_key(category).await?;
        let prompt = Self::elaboration_prompt(category, person_name, news_title);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            tools: vec![serde_json::json!({ "google_search": {} })],
            generation_config: None,
        };

        let response = self
            .client
            .post(STREAM_URL)
            .header("x-goog-api-key", &key)
            .timeout(STREAM_CONNECT_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| PaparazziError::network(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaparazziError::api(format!(
                "Generation API error ({}): {}",
                status, body
            )));
        }

        let (tx, rx) = mpsc::channel::<PaparazziResult<String>>(32);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(newline) = buffer.find('\n') {
                            let line = buffer[..newline].trim_end_matches('\r').to_string();
                            buffer.drain(..=newline);
                            if let Some(text) = sse_chunk_text(&line) {
                                if tx.send(Ok(text)).await.is_err() {
                                    return; // consumer went away
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(PaparazziError::network(format!(
                                "Stream read failed: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                }
            }
            // Trailing line without a newline
            if let Some(text) = sse_chunk_text(buffer.trim_end()) {
                let _ = tx.send(Ok(text)).await;
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response), "Hello world");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(extract_text(&response), "");
    }

    #[test]
    fn test_sse_chunk_text() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        assert_eq!(sse_chunk_text(line).as_deref(), Some("chunk"));
        assert!(sse_chunk_text("event: ping").is_none());
        assert!(sse_chunk_text("data: not json").is_none());
    }

    #[test]
    fn test_listing_prompt_mentions_format() {
        let prompt = GeminiClient::listing_prompt(Category::Hollywood);
        assert!(prompt.contains("[Person Name] - [Single line news description]"));
        assert!(prompt.contains("Hollywood"));
    }
}
