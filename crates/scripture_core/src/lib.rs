pub mod cache;
pub mod domain;
pub mod ports;
pub mod usecases;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheEntry, CacheKey, ALL_CHAPTERS_KEY, CHAPTER_KEY_PREFIX};
pub use domain::{Annotation, Bookmark, Chapter, NewBookmark, SearchResults, Verse};
pub use ports::{
    BookmarkRepository, CacheStore, ContentRepository, NoCache, PortError, PortResult,
};
pub use usecases::{BookmarkService, ContentPolicy, ContentService};
