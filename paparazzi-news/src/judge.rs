//! Semantic judge: small yes/no or structured verdicts from a language model
//!
//! Image relevance, video matching and dedup all reduce to asking a model a
//! narrow question. The `SemanticJudge` trait keeps the pipeline testable
//! with deterministic fakes; `ChatJudge` is the production implementation
//! speaking OpenAI-compatible chat completions.

use async_trait::async_trait;
use paparazzi_core::{PaparazziError, PaparazziResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CHAT_API: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// One row of the dedup payload sent to the judge
#[derive(Debug, Clone, Serialize)]
pub struct DedupRow {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// A duplicate pair the judge wants resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateVerdict {
    pub keep_id: Option<String>,
    pub delete_id: String,
    pub reason: Option<String>,
}

/// Narrow verdict interface so the pipeline never depends on prompt text
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    /// Does this image filename denote only the given person?
    async fn image_depicts_only(&self, file_url: &str, person_name: &str)
        -> PaparazziResult<bool>;

    /// Do the search query and the video title describe the same event?
    async fn same_event(&self, query: &str, video_title: &str) -> PaparazziResult<bool>;

    /// Identify clear duplicate pairs among the given rows
    async fn find_duplicates(&self, rows: &[DedupRow]) -> PaparazziResult<Vec<DuplicateVerdict>>;
}

/// Chat-completions backed judge (Groq-hosted model by default)
#[derive(Debug, Clone)]
pub struct ChatJudge {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// One single-turn chat completion. Also used by the generic judge proxy
/// endpoint, which supplies its own API key per request.
pub async fn chat_completion(
    client: &Client,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
) -> PaparazziResult<String> {
    let request = ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
    };

    let send = || async {
        client
            .post(DEFAULT_CHAT_API)
            .bearer_auth(api_key)
            .timeout(CHAT_TIMEOUT)
            .json(&request)
            .send()
            .await
    };

    // One quick retry on transport failure, then give up
    let response = match send().await {
        Ok(response) => response,
        Err(_) => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            send()
                .await
                .map_err(|e| PaparazziError::network(format!("Judge request failed: {}", e)))?
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PaparazziError::api(format!(
            "Judge API error ({}): {}",
            status, body
        )));
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| PaparazziError::parse(format!("Failed to parse judge response: {}", e)))?;

    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

impl ChatJudge {
    pub fn new(api_key: impl Into<String>) -> PaparazziResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PaparazziError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: std::env::var("JUDGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn from_env() -> PaparazziResult<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| PaparazziError::config("GROQ_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    async fn ask(&self, system: &str, user: &str) -> PaparazziResult<String> {
        chat_completion(&self.client, &self.api_key, &self.model, system, user).await
    }
}

const IMAGE_JUDGE_SYSTEM: &str = "You decide whether an image filename denotes ONLY the target \
person. Rules: answer NO if another distinct person's name appears in the filename, unless that \
name is joined to the target with 'and' or '&'. For filenames of the form 'X at Y', answer YES \
only when the target is X (the attendee), never when the target is Y (the host or venue). \
Answer with exactly YES or NO.";

const VIDEO_JUDGE_SYSTEM: &str = "You decide whether a news search query and a video title \
describe the same event. Answer with exactly YES or NO.";

const DEDUP_JUDGE_SYSTEM: &str = "You are given a list of news items as a JSON array with fields \
id, title, body. Identify pairs of items that are semantically duplicates (same meaning). Return \
a JSON array of objects {keep_id, delete_id, reason}. Choose one of each duplicate pair to keep \
and mark the other for deletion. Only return pairs that are clear duplicates.";

fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with("yes")
}

#[async_trait]
impl SemanticJudge for ChatJudge {
    #[instrument(skip(self))]
    async fn image_depicts_only(
        &self,
        file_url: &str,
        person_name: &str,
    ) -> PaparazziResult<bool> {
        let user = format!("Target person: {}\nFilename: {}", person_name, file_url);
        let answer = self.ask(IMAGE_JUDGE_SYSTEM, &user).await?;
        debug!("Image judge for '{}': {}", person_name, answer.trim());
        Ok(is_affirmative(&answer))
    }

    #[instrument(skip(self))]
    async fn same_event(&self, query: &str, video_title: &str) -> PaparazziResult<bool> {
        let user = format!("Search query: {}\nVideo title: {}", query, video_title);
        let answer = self.ask(VIDEO_JUDGE_SYSTEM, &user).await?;
        Ok(is_affirmative(&answer))
    }

    #[instrument(skip(self, rows))]
    async fn find_duplicates(&self, rows: &[DedupRow]) -> PaparazziResult<Vec<DuplicateVerdict>> {
        let payload = serde_json::to_string(rows)
            .map_err(|e| PaparazziError::internal(format!("Failed to encode dedup rows: {}", e)))?;
        let answer = self.ask(DEDUP_JUDGE_SYSTEM, &payload).await?;
        Ok(parse_duplicate_verdicts(&answer))
    }
}

/// Find the first balanced `[...]` or `{...}` substring, skipping over
/// string literals and escapes. Judge responses frequently wrap the JSON in
/// prose or trailing junk.
pub fn extract_first_json_chunk(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'[' || b == b'{')?;
    let open = bytes[start];
    let close = if open == b'[' { b']' } else { b'}' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse duplicate verdicts out of a judge response of any tolerated shape:
/// a bare JSON array, an object wrapping an array under some key, or a
/// string field containing embedded JSON with trailing junk. Unrecognizable
/// responses yield an empty list, never an error.
pub fn parse_duplicate_verdicts(text: &str) -> Vec<DuplicateVerdict> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if let Some(verdicts) = verdicts_from_value(&value) {
            return verdicts;
        }
    }
    if let Some(chunk) = extract_first_json_chunk(text) {
        if let Ok(value) = serde_json::from_str::<Value>(chunk) {
            if let Some(verdicts) = verdicts_from_value(&value) {
                return verdicts;
            }
        }
    }
    Vec::new()
}

fn verdicts_from_value(value: &Value) -> Option<Vec<DuplicateVerdict>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(verdict_from_item).collect()),
        Value::Object(map) => {
            for inner in map.values() {
                match inner {
                    Value::Array(items) => {
                        return Some(items.iter().filter_map(verdict_from_item).collect());
                    }
                    Value::String(s) => {
                        if let Some(chunk) = extract_first_json_chunk(s) {
                            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(chunk) {
                                return Some(
                                    items.iter().filter_map(verdict_from_item).collect(),
                                );
                            }
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

fn verdict_from_item(item: &Value) -> Option<DuplicateVerdict> {
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| item.get(*k))
            .and_then(string_or_number)
    };
    let delete_id = get(&["delete_id", "deleteId", "deleteid"])?;
    if delete_id.is_empty() {
        return None;
    }
    Some(DuplicateVerdict {
        keep_id: get(&["keep_id", "keepId", "keepid"]),
        delete_id,
        reason: item
            .get("reason")
            .and_then(|v| v.as_str())
            .map(String::from),
    })
}

/// Ids come back as strings or numbers depending on the model's mood
fn string_or_number(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_balanced_array() {
        let text = "Sure, here it is: [{\"a\": 1}, {\"b\": [2]}] hope that helps";
        assert_eq!(
            extract_first_json_chunk(text),
            Some("[{\"a\": 1}, {\"b\": [2]}]")
        );
    }

    #[test]
    fn test_extract_ignores_brackets_in_strings() {
        let text = r#"{"note": "closing ] inside", "x": 1} trailing"#;
        assert_eq!(
            extract_first_json_chunk(text),
            Some(r#"{"note": "closing ] inside", "x": 1}"#)
        );
    }

    #[test]
    fn test_extract_none_without_json() {
        assert!(extract_first_json_chunk("no structured data here").is_none());
        assert!(extract_first_json_chunk("[unclosed").is_none());
    }

    #[test]
    fn test_parse_bare_array() {
        let verdicts = parse_duplicate_verdicts(
            r#"[{"keep_id":"a","delete_id":"b","reason":"same story"}]"#,
        );
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].delete_id, "b");
        assert_eq!(verdicts[0].keep_id.as_deref(), Some("a"));
        assert_eq!(verdicts[0].reason.as_deref(), Some("same story"));
    }

    #[test]
    fn test_parse_wrapped_array() {
        let verdicts =
            parse_duplicate_verdicts(r#"{"duplicates":[{"delete_id":"x"},{"delete_id":""}]}"#);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].delete_id, "x");
        assert!(verdicts[0].keep_id.is_none());
    }

    #[test]
    fn test_parse_embedded_string_with_trailing_junk() {
        let raw = r#"{"json": "[{\"keep_id\":\"1\",\"delete_id\":\"2\"}]<div>html tail</div>"}"#;
        let verdicts = parse_duplicate_verdicts(raw);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].delete_id, "2");
    }

    #[test]
    fn test_parse_prose_wrapped_array() {
        let raw = "Here are the duplicates I found:\n[{\"deleteId\": 42, \"keepId\": 41}]\nDone.";
        let verdicts = parse_duplicate_verdicts(raw);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].delete_id, "42");
        assert_eq!(verdicts[0].keep_id.as_deref(), Some("41"));
    }

    #[test]
    fn test_parse_garbage_yields_empty() {
        assert!(parse_duplicate_verdicts("I found no duplicates.").is_empty());
        assert!(parse_duplicate_verdicts("").is_empty());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("yes, same event"));
        assert!(!is_affirmative("NO"));
        assert!(!is_affirmative("It depends"));
    }
}
