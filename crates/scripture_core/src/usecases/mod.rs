//! crates/scripture_core/src/usecases/mod.rs
//!
//! Orchestration on top of the ports: the cache-aware content service and the
//! bookmark service.

pub mod bookmarks;
pub mod content;

pub use bookmarks::BookmarkService;
pub use content::{ContentPolicy, ContentService};

use crate::ports::{PortError, PortResult};
use std::future::Future;
use std::time::Duration;

/// Runs a store-bound operation under `limit`. Elapsing is an `Unexpected` error.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Unexpected(format!(
            "{} timed out after {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}
