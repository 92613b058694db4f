//! Seam traits for the refresh pipeline
//!
//! The orchestrator and resolvers are written against these traits so that
//! tests can substitute deterministic fakes for the remote services.

use async_trait::async_trait;
use futures::stream::BoxStream;
use paparazzi_core::{Category, PaparazziResult};

/// Produces raw generated text for a category, and streams long-form
/// elaborations for a single item.
#[async_trait]
pub trait NewsGenerator: Send + Sync {
    /// One-shot generation of the category's news listing
    async fn generate(&self, category: Category) -> PaparazziResult<String>;

    /// Incremental elaboration of a single headline. Each stream item is one
    /// text chunk; the stream ends on completion or yields an Err and stops.
    async fn stream_elaboration(
        &self,
        category: Category,
        person_name: &str,
        news_title: &str,
    ) -> PaparazziResult<BoxStream<'static, PaparazziResult<String>>>;
}

/// Image search returning candidate URLs, best first
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search_images(&self, query: &str) -> PaparazziResult<Vec<String>>;
}

/// A single video search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHit {
    pub video_id: String,
    pub title: String,
}

/// Video search returning at most the top hit
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search_first(&self, query: &str) -> PaparazziResult<Option<VideoHit>>;
}
