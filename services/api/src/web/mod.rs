//! services/api/src/web/mod.rs
//!
//! The REST transport: handlers, shared state and the route table.

pub mod envelope;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::rest::{
    add_bookmark_handler, chapter_detail_handler, clear_bookmarks_handler, health_handler,
    list_chapters_handler, remove_bookmark_handler, search_handler, user_bookmarks_handler,
    verse_detail_handler,
};
use self::state::AppState;

/// Builds the REST routes with the request-id layer applied. CORS and the
/// Swagger UI are layered on by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/content/chapters", get(list_chapters_handler))
        .route("/api/v1/content/chapters/{number}", get(chapter_detail_handler))
        .route(
            "/api/v1/content/chapters/{number}/verses/{verse}",
            get(verse_detail_handler),
        )
        .route("/api/v1/content/search", get(search_handler))
        .route(
            "/api/v1/bookmarks",
            post(add_bookmark_handler).delete(remove_bookmark_handler),
        )
        .route(
            "/api/v1/bookmarks/{user_id}",
            get(user_bookmarks_handler).delete(clear_bookmarks_handler),
        )
        .layer(axum_middleware::from_fn(middleware::request_context))
        .with_state(state)
}
