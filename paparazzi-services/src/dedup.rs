//! Duplicate sweeper
//!
//! Periodically asks the semantic judge to spot duplicate stories among the
//! most recent rows of each category and deletes the losers. Everything here
//! is best-effort; a judge outage or a failed delete only logs.

use paparazzi_core::{Category, PaparazziResult};
use paparazzi_news::{DedupRow, SemanticJudge};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::store::NewsStore;

/// How many recent rows per category the judge sees
const SWEEP_WINDOW: usize = 20;

pub struct DedupService {
    store: Arc<NewsStore>,
    judge: Arc<dyn SemanticJudge>,
}

/// Per-category result of one sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub category: Category,
    pub examined: usize,
    pub deleted: usize,
}

impl DedupService {
    pub fn new(store: Arc<NewsStore>, judge: Arc<dyn SemanticJudge>) -> Self {
        Self { store, judge }
    }

    /// Sweep every category once
    #[instrument(skip(self))]
    pub async fn sweep_all(&self) -> Vec<SweepOutcome> {
        let mut outcomes = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            match self.sweep_category(category).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Dedup sweep failed for {}: {}", category, e);
                    outcomes.push(SweepOutcome {
                        category,
                        examined: 0,
                        deleted: 0,
                    });
                }
            }
        }
        outcomes
    }

    async fn sweep_category(&self, category: Category) -> PaparazziResult<SweepOutcome> {
        let records = self
            .store
            .latest(category, SWEEP_WINDOW)
            .map_err(|e| paparazzi_core::PaparazziError::store(e.to_string()))?;

        if records.len() < 2 {
            return Ok(SweepOutcome {
                category,
                examined: records.len(),
                deleted: 0,
            });
        }

        let rows: Vec<DedupRow> = records
            .iter()
            .map(|r| DedupRow {
                id: r.id.clone(),
                title: r.person_name.clone(),
                body: r.news_text.clone(),
            })
            .collect();

        let verdicts = self.judge.find_duplicates(&rows).await?;
        let examined = rows.len();

        let mut deleted = 0;
        for verdict in verdicts {
            match self.store.delete_by_id(category, &verdict.delete_id) {
                Ok(true) => {
                    info!(
                        "Deleted duplicate {} in {} ({})",
                        verdict.delete_id,
                        category,
                        verdict.reason.as_deref().unwrap_or("no reason given")
                    );
                    deleted += 1;
                }
                Ok(false) => {
                    // Already gone, likely deleted by a concurrent sweep
                }
                Err(e) => warn!(
                    "Failed to delete duplicate {} in {}: {}",
                    verdict.delete_id, category, e
                ),
            }
        }

        Ok(SweepOutcome {
            category,
            examined,
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use paparazzi_core::{NewsDraft, NewsRecord};
    use paparazzi_news::DuplicateVerdict;

    /// Judge that flags the second row as a duplicate of the first
    struct PairJudge;

    #[async_trait]
    impl SemanticJudge for PairJudge {
        async fn image_depicts_only(
            &self,
            _file_url: &str,
            _person_name: &str,
        ) -> PaparazziResult<bool> {
            Ok(true)
        }

        async fn same_event(&self, _query: &str, _video_title: &str) -> PaparazziResult<bool> {
            Ok(true)
        }

        async fn find_duplicates(
            &self,
            rows: &[DedupRow],
        ) -> PaparazziResult<Vec<DuplicateVerdict>> {
            Ok(vec![DuplicateVerdict {
                keep_id: Some(rows[0].id.clone()),
                delete_id: rows[1].id.clone(),
                reason: Some("same story".to_string()),
            }])
        }
    }

    fn record(person: &str, text: &str) -> NewsRecord {
        NewsRecord::from_draft(
            NewsDraft::new(person, text),
            Category::Hollywood,
            "https://img.example/p.jpg".to_string(),
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_sweep_deletes_flagged_duplicates() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        store
            .insert_records(
                Category::Hollywood,
                &[
                    record("Star One", "Announces a new film project"),
                    record("Star One", "Reveals an upcoming film project"),
                ],
            )
            .unwrap();

        let service = DedupService::new(store.clone(), Arc::new(PairJudge));
        let outcomes = service.sweep_all().await;

        let hollywood = outcomes
            .iter()
            .find(|o| o.category == Category::Hollywood)
            .unwrap();
        assert_eq!(hollywood.examined, 2);
        assert_eq!(hollywood.deleted, 1);
        assert_eq!(store.latest(Category::Hollywood, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_sparse_categories() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        store
            .insert_records(Category::Tv, &[record("Solo Star", "The only story today")])
            .unwrap();

        let service = DedupService::new(store.clone(), Arc::new(PairJudge));
        let outcomes = service.sweep_all().await;

        // A single row can't have a duplicate; the judge is never asked
        let tv = outcomes.iter().find(|o| o.category == Category::Tv).unwrap();
        assert_eq!(tv.deleted, 0);
        assert_eq!(store.latest(Category::Tv, 10).unwrap().len(), 1);
    }
}
