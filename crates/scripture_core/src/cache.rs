//! crates/scripture_core/src/cache.rs
//!
//! The cache key space and the typed payloads stored under it. Each key variant
//! owns exactly one payload schema, so decoding is chosen by the key and never
//! by inspecting the cached bytes.

use crate::domain::Chapter;
use std::fmt;

/// Key holding the list of every chapter (without verses).
pub const ALL_CHAPTERS_KEY: &str = "content:chapters:all";

/// Prefix shared by every per-chapter detail key.
pub const CHAPTER_KEY_PREFIX: &str = "content:chapter:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    AllChapters,
    Chapter(i32),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::AllChapters => f.write_str(ALL_CHAPTERS_KEY),
            CacheKey::Chapter(number) => write!(f, "{}{}", CHAPTER_KEY_PREFIX, number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    ChapterList(Vec<Chapter>),
    ChapterDetail(Chapter),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheCodecError {
    #[error("failed to encode cache entry: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode cache entry for {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

impl CacheEntry {
    /// Serializes the payload to the JSON stored in the cache.
    pub fn encode(&self) -> Result<String, CacheCodecError> {
        let encoded = match self {
            CacheEntry::ChapterList(chapters) => serde_json::to_string(chapters),
            CacheEntry::ChapterDetail(chapter) => serde_json::to_string(chapter),
        };
        encoded.map_err(CacheCodecError::Encode)
    }

    /// Parses `raw` with the schema that belongs to `key`.
    pub fn decode(key: CacheKey, raw: &str) -> Result<CacheEntry, CacheCodecError> {
        let decoded = match key {
            CacheKey::AllChapters => serde_json::from_str(raw).map(CacheEntry::ChapterList),
            CacheKey::Chapter(_) => serde_json::from_str(raw).map(CacheEntry::ChapterDetail),
        };
        decoded.map_err(|source| CacheCodecError::Decode {
            key: key.to_string(),
            source,
        })
    }
}
