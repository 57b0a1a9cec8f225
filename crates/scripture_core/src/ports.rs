//! crates/scripture_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete store and cache.

use async_trait::async_trait;
use std::time::Duration;
use crate::domain::{Bookmark, Chapter, Verse};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, cache).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    BadInput(String),
    /// Reserved for uniqueness enforcement on bookmarks; nothing raises it yet.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read access to chapters and verses.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// All chapters without verses, ordered by number.
    async fn list_all_chapters(&self) -> PortResult<Vec<Chapter>>;

    /// One chapter with its verses ordered by verse number.
    async fn get_chapter_by_number(&self, number: i32) -> PortResult<Chapter>;

    async fn search_chapters(&self, text: &str, limit: usize) -> PortResult<Vec<Chapter>>;

    /// Resolves through the chapter *number*, not the chapter id.
    async fn get_verse(&self, chapter_number: i32, verse_number: i32) -> PortResult<Verse>;

    /// Each result carries its parent chapter without verses.
    async fn search_verses(&self, text: &str, limit: usize) -> PortResult<Vec<Verse>>;
}

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Inserts when `id == 0`, otherwise overwrites the row with that id.
    async fn save(&self, bookmark: Bookmark) -> PortResult<Bookmark>;

    /// Newest first, each with its parent chapter attached.
    async fn list_by_user(&self, user_id: &str) -> PortResult<Vec<Bookmark>>;

    /// Deletes every matching row and returns how many were removed.
    async fn delete(&self, user_id: &str, chapter_id: i64, verse_number: i32) -> PortResult<u64>;

    async fn clear_all(&self, user_id: &str) -> PortResult<u64>;
}

/// A string key/value store with expiry and prefix deletion.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()>;

    async fn delete(&self, key: &str) -> PortResult<()>;

    /// Removes every key starting with `prefix` incrementally and returns the count.
    async fn delete_prefix(&self, prefix: &str) -> PortResult<u64>;

    /// Drops every key in the store.
    async fn flush_all(&self) -> PortResult<()>;
}

//=========================================================================================
// Disabled Cache
//=========================================================================================

/// The cache used when caching is disabled: every read misses, every write succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

#[async_trait]
impl CacheStore for NoCache {
    async fn get(&self, _key: &str) -> PortResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> PortResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> PortResult<()> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> PortResult<u64> {
        Ok(0)
    }

    async fn flush_all(&self) -> PortResult<()> {
        Ok(())
    }
}
