//! API route definitions

mod dedup;
mod health;
mod judge;
mod news;
mod push;
mod refresh;
mod videos;

use crate::AppState;
use axum::Router;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(news::routes())
        .merge(refresh::routes())
        .merge(videos::routes())
        .merge(push::routes())
        .merge(judge::routes())
        .merge(dedup::routes())
}
