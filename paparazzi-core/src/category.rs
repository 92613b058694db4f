//! News category definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of news verticals served by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Indian film industry news
    Bollywood,
    /// Indian television and daily soap news
    Tv,
    /// American film and music industry news
    Hollywood,
}

impl Category {
    /// All categories, in the order the refresh job runs them
    pub const ALL: [Category; 3] = [Category::Bollywood, Category::Tv, Category::Hollywood];

    /// Lowercase identifier used in URLs and table names
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Bollywood => "bollywood",
            Category::Tv => "tv",
            Category::Hollywood => "hollywood",
        }
    }

    /// Backing table for this category's records
    pub fn table_name(&self) -> String {
        format!("{}_news", self.slug())
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Bollywood => "Bollywood",
            Category::Tv => "TV",
            Category::Hollywood => "Hollywood",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bollywood" => Ok(Category::Bollywood),
            "tv" => Ok(Category::Tv),
            "hollywood" => Ok(Category::Hollywood),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}
