//! News record data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Category;

/// Image shown when no usable photo can be resolved for a person
pub const FALLBACK_IMAGE_URL: &str =
    "https://images.pexels.com/photos/1065084/pexels-photo-1065084.jpeg?auto=compress&cs=tinysrgb&w=800";

/// A news item as it comes out of the line parser, before enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDraft {
    /// The public figure the item is about. May name several people joined
    /// by "and"/"&"; image lookups normalize to the first one.
    pub person_name: String,
    /// Short single-line headline
    pub news_text: String,
    /// Optional long-form narrative, present only when the generated line
    /// carried an in-band body section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_body: Option<String>,
    /// Convenience string for downstream searches
    pub search_query: String,
}

impl NewsDraft {
    pub fn new(person_name: impl Into<String>, news_text: impl Into<String>) -> Self {
        let person_name = person_name.into();
        let news_text = news_text.into();
        let search_query = format!("{} {}", person_name, news_text);
        Self {
            person_name,
            news_text,
            news_body: None,
            search_query,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.news_body = Some(body.into());
        self
    }
}

/// A fully enriched, persisted news record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Unique identifier, assigned at persistence time
    pub id: String,
    pub category: Category,
    pub person_name: String,
    pub news_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_body: Option<String>,
    /// Resolved image URL; never empty (placeholder fallback)
    pub image_url: String,
    /// Set only when the keyword heuristic fired AND the judge confirmed
    /// the video matches the headline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub search_query: String,
}

impl NewsRecord {
    /// Build a record from a parsed draft and its enrichment results
    pub fn from_draft(
        draft: NewsDraft,
        category: Category,
        image_url: String,
        youtube_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            person_name: draft.person_name,
            news_text: draft.news_text,
            news_body: draft.news_body,
            image_url,
            youtube_url,
            created_at,
            search_query: draft.search_query,
        }
    }
}
