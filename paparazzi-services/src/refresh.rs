//! Refresh orchestrator
//!
//! Runs the generate -> parse -> enrich -> evict -> insert cycle for every
//! category. Categories run concurrently and fail independently; one broken
//! upstream never sinks the whole refresh.

use chrono::{Duration, Utc};
use paparazzi_core::{Category, CategoryOutcome, NewsRecord, PaparazziResult, RefreshSummary};
use paparazzi_news::{parse_news_lines, ImageResolver, NewsGenerator, VideoMatcher};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::store::NewsStore;

const DEFAULT_RETENTION_HOURS: i64 = 48;

/// Tunables for the refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Rows older than this many hours are evicted before insert
    pub retention_hours: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            retention_hours: DEFAULT_RETENTION_HOURS,
        }
    }
}

impl RefreshConfig {
    pub fn from_env() -> Self {
        let retention_hours = std::env::var("NEWS_RETENTION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&h: &i64| h > 0)
            .unwrap_or(DEFAULT_RETENTION_HOURS);
        Self { retention_hours }
    }
}

pub struct RefreshService {
    generator: Arc<dyn NewsGenerator>,
    images: ImageResolver,
    videos: VideoMatcher,
    store: Arc<NewsStore>,
    config: RefreshConfig,
}

impl RefreshService {
    pub fn new(
        generator: Arc<dyn NewsGenerator>,
        images: ImageResolver,
        videos: VideoMatcher,
        store: Arc<NewsStore>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            generator,
            images,
            videos,
            store,
            config,
        }
    }

    /// Refresh all categories concurrently, collecting every outcome
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> RefreshSummary {
        let outcomes = futures::future::join_all(
            Category::ALL
                .iter()
                .map(|&category| self.refresh_outcome(category)),
        )
        .await;

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!(
            "Refresh complete: {}/{} categories succeeded",
            succeeded,
            outcomes.len()
        );

        RefreshSummary {
            message: format!(
                "News update completed: {}/{} categories refreshed",
                succeeded,
                outcomes.len()
            ),
            results: outcomes,
            timestamp: Utc::now(),
        }
    }

    async fn refresh_outcome(&self, category: Category) -> CategoryOutcome {
        match self.refresh_category(category).await {
            Ok(count) => CategoryOutcome::ok(category, count),
            Err(e) => {
                warn!("Refresh failed for {}: {}", category, e);
                CategoryOutcome::failed(category, e.to_string())
            }
        }
    }

    /// One category's full cycle. Returns the number of rows inserted.
    #[instrument(skip(self))]
    pub async fn refresh_category(&self, category: Category) -> PaparazziResult<usize> {
        let text = self.generator.generate(category).await?;
        let drafts = parse_news_lines(&text);

        // Stale rows are purged every cycle, even one that produced nothing.
        // Eviction failure is not worth losing fresh records over.
        let cutoff = Utc::now() - Duration::hours(self.config.retention_hours);
        match self.store.evict_older_than(category, cutoff) {
            Ok(0) => {}
            Ok(evicted) => info!("Evicted {} stale rows from {}", evicted, category),
            Err(e) => warn!("Eviction failed for {}: {}", category, e),
        }

        if drafts.is_empty() {
            info!("No parseable items for {}, skipping insert", category);
            return Ok(0);
        }

        let records: Vec<NewsRecord> = futures::future::join_all(
            drafts.into_iter().map(|draft| async move {
                let (image_url, youtube_url) = tokio::join!(
                    self.images.resolve(&draft.person_name, category),
                    self.videos.match_video(&draft.search_query, &draft.news_text),
                );
                NewsRecord::from_draft(draft, category, image_url, youtube_url, Utc::now())
            }),
        )
        .await;

        let inserted = self
            .store
            .insert_records(category, &records)
            .map_err(|e| paparazzi_core::PaparazziError::store(e.to_string()))?;
        info!("Inserted {} records for {}", inserted, category);
        Ok(inserted)
    }
}
