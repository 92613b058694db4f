//! Outbound clients and pipeline logic for the Paparazzi news terminal
//!
//! This crate provides:
//! - Gemini-style generation client (blocking + streaming)
//! - the line parser that turns generated text into news drafts
//! - Wikimedia Commons image search and the image resolver
//! - YouTube video search and the video matcher
//! - the `SemanticJudge` seam and its chat-completions implementation

pub mod backoff;
pub mod gemini;
pub mod images;
pub mod judge;
pub mod parser;
pub mod resolver;
pub mod traits;
pub mod videos;

pub use gemini::GeminiClient;
pub use images::WikimediaClient;
pub use judge::{ChatJudge, DedupRow, DuplicateVerdict, SemanticJudge};
pub use parser::{parse_news_lines, BODY_SEPARATOR, MAX_ITEMS_PER_CYCLE};
pub use resolver::{ImageResolver, VideoMatcher};
pub use traits::{ImageSearch, NewsGenerator, VideoHit, VideoSearch};
pub use videos::YouTubeClient;
