//! Refresh cycle summary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Category;

/// Outcome of one category's refresh cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub category: Category,
    pub success: bool,
    /// Number of records inserted, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryOutcome {
    pub fn ok(category: Category, count: usize) -> Self {
        Self {
            category,
            success: true,
            count: Some(count),
            error: None,
        }
    }

    pub fn failed(category: Category, error: impl Into<String>) -> Self {
        Self {
            category,
            success: false,
            count: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate summary returned by the refresh trigger endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub message: String,
    pub results: Vec<CategoryOutcome>,
    pub timestamp: DateTime<Utc>,
}
