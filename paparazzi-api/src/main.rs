//! Paparazzi News Terminal API Server
//!
//! HTTP API server for the celebrity news terminal: refresh pipeline
//! trigger, category feeds, SSE content expansion, video search, push
//! notifications and the dedup sweep.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use paparazzi_news::{
    ChatJudge, GeminiClient, ImageResolver, SemanticJudge, VideoMatcher, WikimediaClient,
    YouTubeClient,
};
use paparazzi_services::{
    ContentExpander, DedupService, NewsStore, PushService, RefreshConfig, RefreshService,
    VapidConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<NewsStore>,
    /// Refresh orchestrator (requires GEMINI_API_KEY or GEMINI_KEY_URL)
    pub refresh: Option<Arc<RefreshService>>,
    pub expander: Option<Arc<ContentExpander>>,
    /// Dedup sweep (requires GROQ_API_KEY)
    pub dedup: Option<Arc<DedupService>>,
    /// Push delivery (requires VAPID keys)
    pub push: Option<Arc<PushService>>,
    /// Standalone video search (requires YOUTUBE_API_KEY)
    pub videos: Option<Arc<YouTubeClient>>,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,paparazzi_api=debug")),
        )
        .init();

    info!("Starting Paparazzi News Terminal API");

    let db_path = std::env::var("NEWS_DB_PATH").unwrap_or_else(|_| "data/news.db".to_string());
    info!("Initializing news store at: {}", db_path);
    let store = Arc::new(NewsStore::new(&db_path)?);

    let judge: Option<Arc<dyn SemanticJudge>> = match ChatJudge::from_env() {
        Ok(judge) => {
            info!("Semantic judge initialized");
            Some(Arc::new(judge))
        }
        Err(e) => {
            info!("Semantic judge not available: {}. Set GROQ_API_KEY to enable.", e);
            None
        }
    };

    let videos = match YouTubeClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            info!("Video search not available: {}. Set YOUTUBE_API_KEY to enable.", e);
            None
        }
    };

    let (refresh, expander) = match GeminiClient::from_env() {
        Ok(generator) => {
            let generator = Arc::new(generator);
            let images = ImageResolver::new(Arc::new(WikimediaClient::new()?), judge.clone());
            let matcher = VideoMatcher::new(
                videos
                    .clone()
                    .map(|c| c as Arc<dyn paparazzi_news::VideoSearch>)
                    .unwrap_or_else(|| Arc::new(NoVideoSearch)),
                judge.clone(),
            );
            let refresh = Arc::new(RefreshService::new(
                generator.clone(),
                images,
                matcher,
                store.clone(),
                RefreshConfig::from_env(),
            ));
            let expander = Arc::new(ContentExpander::new(generator, store.clone()));
            info!("Refresh pipeline initialized");
            (Some(refresh), Some(expander))
        }
        Err(e) => {
            info!(
                "Refresh pipeline not available: {}. Set GEMINI_API_KEY or GEMINI_KEY_URL to enable.",
                e
            );
            (None, None)
        }
    };

    let dedup = judge
        .clone()
        .map(|judge| Arc::new(DedupService::new(store.clone(), judge)));

    let push = match VapidConfig::from_env() {
        Ok(vapid) => {
            info!("Push delivery initialized");
            Some(Arc::new(PushService::new(store.clone(), vapid)))
        }
        Err(e) => {
            info!("Push delivery not available: {}. Set VAPID keys to enable.", e);
            None
        }
    };

    let state = AppState {
        store,
        refresh,
        expander,
        dedup,
        push,
        videos,
        http: reqwest::Client::new(),
    };

    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state);

    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Stand-in when no YouTube key is configured; the keyword gate still runs
/// but every search comes back empty.
struct NoVideoSearch;

#[async_trait::async_trait]
impl paparazzi_news::VideoSearch for NoVideoSearch {
    async fn search_first(
        &self,
        _query: &str,
    ) -> paparazzi_core::PaparazziResult<Option<paparazzi_news::VideoHit>> {
        Ok(None)
    }
}
