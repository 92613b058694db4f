//! Image and video resolution for news records
//!
//! `ImageResolver` turns a person name into a single usable image URL and is
//! deliberately infallible: any failure along the way degrades to the fixed
//! placeholder. `VideoMatcher` attaches a watch URL only when the headline
//! plausibly refers to footage and the judge confirms the top search hit.

use paparazzi_core::{Category, FALLBACK_IMAGE_URL};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::images::{filename_has_name_token, is_usable_image_url};
use crate::judge::SemanticJudge;
use crate::traits::{ImageSearch, VideoSearch};
use crate::videos::watch_url;

/// Headline words that suggest actual footage exists
const VIDEO_KEYWORDS: &[&str] = &[
    "video", "videos", "clip", "clips", "reel", "reels", "shows", "shares", "shared", "tape",
    "capture", "caught", "tiktok", "instagram", "announced", "revealed",
];

pub struct ImageResolver {
    search: Arc<dyn ImageSearch>,
    judge: Option<Arc<dyn SemanticJudge>>,
}

impl ImageResolver {
    pub fn new(search: Arc<dyn ImageSearch>, judge: Option<Arc<dyn SemanticJudge>>) -> Self {
        Self { search, judge }
    }

    /// Resolve an image URL for a person. Never fails; the placeholder is the
    /// terminal fallback.
    pub async fn resolve(&self, person_name: &str, category: Category) -> String {
        let subject = primary_subject(person_name);

        // Category-hinted query first for disambiguation, then the bare name
        let hinted = format!("{} {}", subject, category.display_name());
        if let Some(url) = self.try_query(&hinted, &subject, true).await {
            return url;
        }
        if let Some(url) = self.try_query(&subject, &subject, false).await {
            return url;
        }

        debug!("No image found for '{}', using placeholder", subject);
        FALLBACK_IMAGE_URL.to_string()
    }

    /// One query through the preference ladder. `relaxed` lets a
    /// judge-approved candidate without a name token through, which is safe
    /// only when the query itself carried a category hint.
    async fn try_query(&self, query: &str, subject: &str, relaxed: bool) -> Option<String> {
        let candidates = match self.search.search_images(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Image search failed for '{}': {}", query, e);
                return None;
            }
        };

        let usable: Vec<&String> = candidates
            .iter()
            .filter(|url| is_usable_image_url(url))
            .collect();
        if usable.is_empty() {
            return None;
        }

        let Some(judge) = &self.judge else {
            // No judge wired in; trust search relevance order
            return Some(usable[0].clone());
        };

        let mut approved = Vec::new();
        let mut judge_failed = false;
        for url in &usable {
            match judge.image_depicts_only(url, subject).await {
                Ok(true) => approved.push((*url).clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!("Image judge failed for '{}': {}", subject, e);
                    judge_failed = true;
                    break;
                }
            }
        }

        if judge_failed {
            // Judge unavailable; first raw candidate beats the placeholder
            return Some(usable[0].clone());
        }

        let with_token: Vec<&String> = approved
            .iter()
            .filter(|url| filename_has_name_token(url, subject))
            .collect();
        if !with_token.is_empty() {
            let pick = rand::rng().random_range(0..with_token.len());
            return Some(with_token[pick].clone());
        }
        if relaxed {
            return approved.first().cloned();
        }
        None
    }
}

/// Names like "Deepika and Ranveer" search badly; keep the first subject
fn primary_subject(person_name: &str) -> String {
    let lower = person_name.to_lowercase();
    for sep in [" and ", " & "] {
        if let Some(idx) = lower.find(sep) {
            return person_name[..idx].trim().to_string();
        }
    }
    person_name.trim().to_string()
}

pub struct VideoMatcher {
    search: Arc<dyn VideoSearch>,
    judge: Option<Arc<dyn SemanticJudge>>,
}

impl VideoMatcher {
    pub fn new(search: Arc<dyn VideoSearch>, judge: Option<Arc<dyn SemanticJudge>>) -> Self {
        Self { search, judge }
    }

    /// Match a watch URL for the headline, or None. The keyword gate runs
    /// before any network call; errors downgrade to None.
    pub async fn match_video(&self, search_query: &str, news_text: &str) -> Option<String> {
        if !headline_suggests_video(news_text) {
            return None;
        }

        let hit = match self.search.search_first(search_query).await {
            Ok(Some(hit)) => hit,
            Ok(None) => return None,
            Err(e) => {
                warn!("Video search failed for '{}': {}", search_query, e);
                return None;
            }
        };

        if let Some(judge) = &self.judge {
            match judge.same_event(search_query, &hit.title).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Video '{}' rejected for '{}'", hit.title, search_query);
                    return None;
                }
                Err(e) => {
                    warn!("Video judge failed for '{}': {}", search_query, e);
                    return None;
                }
            }
        }

        Some(watch_url(&hit.video_id))
    }
}

fn headline_suggests_video(news_text: &str) -> bool {
    let lower = news_text.to_lowercase();
    VIDEO_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{DedupRow, DuplicateVerdict};
    use crate::traits::VideoHit;
    use async_trait::async_trait;
    use paparazzi_core::{PaparazziError, PaparazziResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeImageSearch {
        results: Vec<String>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ImageSearch for FakeImageSearch {
        async fn search_images(&self, _query: &str) -> PaparazziResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PaparazziError::api("search down"));
            }
            Ok(self.results.clone())
        }
    }

    struct FakeVideoSearch {
        hit: Option<VideoHit>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VideoSearch for FakeVideoSearch {
        async fn search_first(&self, _query: &str) -> PaparazziResult<Option<VideoHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hit.clone())
        }
    }

    /// Judge that approves filenames containing a marker, confirms all
    /// events, and optionally errors on every call.
    struct FakeJudge {
        approve_marker: &'static str,
        confirm_events: bool,
        error: bool,
    }

    #[async_trait]
    impl SemanticJudge for FakeJudge {
        async fn image_depicts_only(
            &self,
            file_url: &str,
            _person_name: &str,
        ) -> PaparazziResult<bool> {
            if self.error {
                return Err(PaparazziError::api("judge down"));
            }
            Ok(file_url.contains(self.approve_marker))
        }

        async fn same_event(&self, _query: &str, _video_title: &str) -> PaparazziResult<bool> {
            if self.error {
                return Err(PaparazziError::api("judge down"));
            }
            Ok(self.confirm_events)
        }

        async fn find_duplicates(
            &self,
            _rows: &[DedupRow],
        ) -> PaparazziResult<Vec<DuplicateVerdict>> {
            Ok(Vec::new())
        }
    }

    fn judge(approve_marker: &'static str) -> Arc<dyn SemanticJudge> {
        Arc::new(FakeJudge {
            approve_marker,
            confirm_events: true,
            error: false,
        })
    }

    #[test]
    fn test_primary_subject_splits_joint_names() {
        assert_eq!(primary_subject("Deepika and Ranveer"), "Deepika");
        assert_eq!(primary_subject("Tom & Zendaya"), "Tom");
        assert_eq!(primary_subject("Shah Rukh Khan"), "Shah Rukh Khan");
    }

    #[test]
    fn test_keyword_gate() {
        assert!(headline_suggests_video("Shares new video from the set"));
        assert!(headline_suggests_video("Caught leaving the premiere"));
        assert!(headline_suggests_video("Announced a world tour"));
        assert!(!headline_suggests_video("Wins lifetime achievement award"));
    }

    #[tokio::test]
    async fn test_resolve_prefers_name_token_match() {
        let search = Arc::new(FakeImageSearch {
            results: vec![
                "https://img.example/Red_carpet.jpg".to_string(),
                "https://img.example/Deepika_Padukone.jpg".to_string(),
            ],
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = ImageResolver::new(search, Some(judge(".jpg")));
        let url = resolver
            .resolve("Deepika Padukone", Category::Bollywood)
            .await;
        assert_eq!(url, "https://img.example/Deepika_Padukone.jpg");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_placeholder() {
        let search = Arc::new(FakeImageSearch {
            results: vec![],
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = ImageResolver::new(search.clone(), Some(judge(".jpg")));
        let url = resolver.resolve("Nobody Famous", Category::Tv).await;
        assert_eq!(url, FALLBACK_IMAGE_URL);
        // Hinted query plus plain query
        assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_survives_search_failure() {
        let search = Arc::new(FakeImageSearch {
            results: vec![],
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let resolver = ImageResolver::new(search, Some(judge(".jpg")));
        let url = resolver.resolve("Anyone", Category::Hollywood).await;
        assert_eq!(url, FALLBACK_IMAGE_URL);
    }

    #[tokio::test]
    async fn test_resolve_uses_raw_candidate_when_judge_errors() {
        let search = Arc::new(FakeImageSearch {
            results: vec!["https://img.example/First_hit.jpg".to_string()],
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let broken = Arc::new(FakeJudge {
            approve_marker: "",
            confirm_events: true,
            error: true,
        });
        let resolver = ImageResolver::new(search, Some(broken));
        let url = resolver.resolve("Anyone", Category::Hollywood).await;
        assert_eq!(url, "https://img.example/First_hit.jpg");
    }

    #[tokio::test]
    async fn test_resolve_skips_documents() {
        let search = Arc::new(FakeImageSearch {
            results: vec![
                "https://img.example/Someone_bio.pdf".to_string(),
                "https://img.example/Someone_2024.png".to_string(),
            ],
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = ImageResolver::new(search, Some(judge("Someone")));
        let url = resolver.resolve("Someone", Category::Bollywood).await;
        assert_eq!(url, "https://img.example/Someone_2024.png");
    }

    #[tokio::test]
    async fn test_matcher_skips_search_without_keyword() {
        let search = Arc::new(FakeVideoSearch {
            hit: Some(VideoHit {
                video_id: "v1".to_string(),
                title: "irrelevant".to_string(),
            }),
            calls: AtomicUsize::new(0),
        });
        let matcher = VideoMatcher::new(search.clone(), Some(judge("")));
        let url = matcher
            .match_video("Someone award query", "Wins top award at gala")
            .await;
        assert!(url.is_none());
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_matcher_attaches_confirmed_video() {
        let search = Arc::new(FakeVideoSearch {
            hit: Some(VideoHit {
                video_id: "abc123".to_string(),
                title: "The viral clip".to_string(),
            }),
            calls: AtomicUsize::new(0),
        });
        let matcher = VideoMatcher::new(search, Some(judge("")));
        let url = matcher
            .match_video("Someone viral clip", "Shares viral clip from concert")
            .await;
        assert_eq!(url.as_deref(), Some("https://www.youtube.com/watch?v=abc123"));
    }

    #[tokio::test]
    async fn test_matcher_rejects_unconfirmed_video() {
        let search = Arc::new(FakeVideoSearch {
            hit: Some(VideoHit {
                video_id: "abc123".to_string(),
                title: "Unrelated footage".to_string(),
            }),
            calls: AtomicUsize::new(0),
        });
        let skeptical = Arc::new(FakeJudge {
            approve_marker: "",
            confirm_events: false,
            error: false,
        });
        let matcher = VideoMatcher::new(search, Some(skeptical));
        let url = matcher
            .match_video("Someone clip", "Shares clip backstage")
            .await;
        assert!(url.is_none());
    }
}
