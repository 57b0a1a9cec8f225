//! crates/scripture_core/src/usecases/bookmarks.rs
//!
//! Thin orchestration over the bookmark repository. Every call is bounded by a
//! short timeout; nothing is cached.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Bookmark, NewBookmark};
use crate::ports::{BookmarkRepository, PortError, PortResult};
use crate::usecases::bounded;

#[derive(Clone)]
pub struct BookmarkService {
    bookmarks: Arc<dyn BookmarkRepository>,
    timeout: Duration,
}

impl BookmarkService {
    pub fn new(bookmarks: Arc<dyn BookmarkRepository>, timeout: Duration) -> Self {
        Self { bookmarks, timeout }
    }

    /// Stores a bookmark. Passing an existing id overwrites that bookmark.
    pub async fn add_bookmark(&self, new: NewBookmark) -> PortResult<Bookmark> {
        let user_id = require_user(&new.user_id)?;
        if new.chapter_id <= 0 {
            return Err(PortError::BadInput("chapter_id must be positive".to_string()));
        }
        if new.verse_number <= 0 {
            return Err(PortError::BadInput("verse_number must be positive".to_string()));
        }
        if matches!(new.id, Some(id) if id < 0) {
            return Err(PortError::BadInput("id must not be negative".to_string()));
        }

        let bookmark = Bookmark {
            id: new.id.unwrap_or(0),
            user_id: user_id.to_string(),
            chapter_id: new.chapter_id,
            verse_number: new.verse_number,
            note: new.note,
            created_at: Utc::now(),
            chapter: None,
        };
        bounded(self.timeout, "save bookmark", self.bookmarks.save(bookmark)).await
    }

    pub async fn user_bookmarks(&self, user_id: &str) -> PortResult<Vec<Bookmark>> {
        let user_id = require_user(user_id)?;
        bounded(self.timeout, "list bookmarks", self.bookmarks.list_by_user(user_id)).await
    }

    /// Removes every bookmark of `user_id` on that verse. Zero matches is not an error.
    pub async fn remove_bookmark(
        &self,
        user_id: &str,
        chapter_id: i64,
        verse_number: i32,
    ) -> PortResult<u64> {
        let user_id = require_user(user_id)?;
        bounded(
            self.timeout,
            "delete bookmark",
            self.bookmarks.delete(user_id, chapter_id, verse_number),
        )
        .await
    }

    pub async fn clear_bookmarks(&self, user_id: &str) -> PortResult<u64> {
        let user_id = require_user(user_id)?;
        bounded(self.timeout, "clear bookmarks", self.bookmarks.clear_all(user_id)).await
    }
}

fn require_user(user_id: &str) -> PortResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(PortError::BadInput("user_id is required".to_string()));
    }
    Ok(trimmed)
}
