//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use scripture_core::{BookmarkService, ContentService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub bookmarks: Arc<BookmarkService>,
}
