//! Content expander
//!
//! Streams a long-form elaboration of a headline. A stored body that is
//! already substantial is served straight from the database; otherwise the
//! generation API streams chunks which are forwarded live and persisted as
//! one body once the stream completes.

use futures::StreamExt;
use paparazzi_core::{Category, PaparazziError, PaparazziResult};
use paparazzi_news::NewsGenerator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};

use crate::store::NewsStore;

/// Stored bodies shorter than this are considered stubs and regenerated
const BODY_CACHE_MIN_WORDS: usize = 90;

const CHANNEL_CAPACITY: usize = 32;

/// One event on the expansion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandEvent {
    /// A chunk of elaboration text
    Text(String),
    /// Stream finished normally
    Done,
    /// Stream aborted; no further events follow
    Error(String),
}

pub struct ContentExpander {
    generator: Arc<dyn NewsGenerator>,
    store: Arc<NewsStore>,
}

impl ContentExpander {
    pub fn new(generator: Arc<dyn NewsGenerator>, store: Arc<NewsStore>) -> Self {
        Self { generator, store }
    }

    /// Expand a headline into a stream of events. The stored body is the
    /// compute-once cache: once a full elaboration is persisted, later
    /// requests never touch the generation API again.
    #[instrument(skip(self))]
    pub async fn expand(
        &self,
        category: Category,
        person_name: &str,
        news_title: &str,
    ) -> PaparazziResult<ReceiverStream<ExpandEvent>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let stored = self
            .store
            .find_by_headline(category, person_name, news_title)
            .map_err(|e| PaparazziError::store(e.to_string()))?;

        if let Some(record) = &stored {
            if let Some(body) = &record.news_body {
                if word_count(body) > BODY_CACHE_MIN_WORDS {
                    debug!("Serving cached body for '{}'", news_title);
                    let body = body.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(ExpandEvent::Text(body)).await;
                        let _ = tx.send(ExpandEvent::Done).await;
                    });
                    return Ok(ReceiverStream::new(rx));
                }
            }
        }

        let mut chunks = self
            .generator
            .stream_elaboration(category, person_name, news_title)
            .await?;

        let store = self.store.clone();
        let record_id = stored.map(|r| r.id);
        tokio::spawn(async move {
            let mut accumulated = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        accumulated.push_str(&text);
                        if tx.send(ExpandEvent::Text(text)).await.is_err() {
                            // Client went away; stop pulling from upstream
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(ExpandEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }
            let _ = tx.send(ExpandEvent::Done).await;

            if accumulated.trim().is_empty() {
                return;
            }
            if let Some(id) = record_id {
                if let Err(e) = store.update_body(category, &id, &accumulated) {
                    warn!("Failed to persist elaborated body for {}: {}", id, e);
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures::stream::{self, BoxStream};
    use paparazzi_core::{NewsDraft, NewsRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ChunkGenerator {
        chunks: Vec<PaparazziResult<String>>,
        calls: AtomicUsize,
    }

    impl ChunkGenerator {
        fn new(chunks: Vec<PaparazziResult<String>>) -> Self {
            Self {
                chunks,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NewsGenerator for ChunkGenerator {
        async fn generate(&self, _category: Category) -> PaparazziResult<String> {
            Err(PaparazziError::internal("not used in this test"))
        }

        async fn stream_elaboration(
            &self,
            _category: Category,
            _person_name: &str,
            _news_title: &str,
        ) -> PaparazziResult<BoxStream<'static, PaparazziResult<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let chunks: Vec<PaparazziResult<String>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(s) => Ok(s.clone()),
                    Err(e) => Err(PaparazziError::api(e.to_string())),
                })
                .collect();
            Ok(stream::iter(chunks).boxed())
        }
    }

    fn seeded_store(body: Option<&str>) -> (Arc<NewsStore>, String) {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        let mut draft = NewsDraft::new("Star One", "Announces a new world tour");
        if let Some(body) = body {
            draft = draft.with_body(body);
        }
        let record = NewsRecord::from_draft(
            draft,
            Category::Hollywood,
            "https://img.example/p.jpg".to_string(),
            None,
            Utc::now(),
        );
        let id = record.id.clone();
        store.insert_records(Category::Hollywood, &[record]).unwrap();
        (store, id)
    }

    async fn collect(mut stream: ReceiverStream<ExpandEvent>) -> Vec<ExpandEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_cached_body_skips_generation() {
        let long_body = "word ".repeat(120);
        let (store, _) = seeded_store(Some(&long_body));
        let generator = Arc::new(ChunkGenerator::new(vec![Ok("unused".to_string())]));
        let expander = ContentExpander::new(generator.clone(), store);

        let events = collect(
            expander
                .expand(Category::Hollywood, "Star One", "Announces a new world tour")
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.last(), Some(&ExpandEvent::Done));
        assert!(matches!(&events[0], ExpandEvent::Text(t) if t.starts_with("word ")));
    }

    #[tokio::test]
    async fn test_stream_chunks_forwarded_and_persisted() {
        let (store, id) = seeded_store(None);
        let generator = Arc::new(ChunkGenerator::new(vec![
            Ok("The singer ".to_string()),
            Ok("confirmed dates ".to_string()),
            Ok("across five continents.".to_string()),
        ]));
        let expander = ContentExpander::new(generator, store.clone());

        let events = collect(
            expander
                .expand(Category::Hollywood, "Star One", "Announces a new world tour")
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&ExpandEvent::Done));

        // Persistence runs in the background after Done
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = store
            .find_by_headline(Category::Hollywood, "Star One", "Announces a new world tour")
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(
            stored.news_body.as_deref(),
            Some("The singer confirmed dates across five continents.")
        );
    }

    #[tokio::test]
    async fn test_stream_error_is_terminal() {
        let (store, _) = seeded_store(None);
        let generator = Arc::new(ChunkGenerator::new(vec![
            Ok("Partial ".to_string()),
            Err(PaparazziError::api("upstream closed")),
            Ok("never sent".to_string()),
        ]));
        let expander = ContentExpander::new(generator, store.clone());

        let events = collect(
            expander
                .expand(Category::Hollywood, "Star One", "Announces a new world tour")
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], ExpandEvent::Error(msg) if msg.contains("upstream closed")));

        // A failed stream must not overwrite the stored body
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = store
            .find_by_headline(Category::Hollywood, "Star One", "Announces a new world tour")
            .unwrap()
            .unwrap();
        assert!(stored.news_body.is_none());
    }

    #[tokio::test]
    async fn test_unknown_headline_still_streams() {
        let store = Arc::new(NewsStore::new_in_memory().unwrap());
        let generator = Arc::new(ChunkGenerator::new(vec![Ok("Some text.".to_string())]));
        let expander = ContentExpander::new(generator, store);

        let events = collect(
            expander
                .expand(Category::Tv, "Unknown Star", "A headline nobody stored")
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(
            events,
            vec![ExpandEvent::Text("Some text.".to_string()), ExpandEvent::Done]
        );
    }
}
