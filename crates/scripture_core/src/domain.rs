//! crates/scripture_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database driver. They derive serde
//! because the same shapes are cached and returned over REST.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A top-level content unit. `verses` is only populated by the detail read and
/// is always serialised, as an empty array on summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Chapter {
    pub id: i64,
    pub number: i32,
    /// Name in the original script.
    pub name: String,
    pub latin_name: String,
    pub english_name: String,
    pub localized_name: String,
    pub revelation_type: String,
    pub verse_count: i32,
    #[serde(default)]
    pub verses: Vec<Verse>,
}

/// A single verse, unique by (chapter_id, number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Verse {
    pub id: i64,
    pub chapter_id: i64,
    pub number: i32,
    pub text_original: String,
    pub text_transliteration: String,
    pub translation: String,
    pub exegesis: String,
    #[serde(default)]
    pub historical_note: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Shallow parent chapter, attached on search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(no_recursion))]
    pub chapter: Option<Box<Chapter>>,
}

/// A recitation rule applied to a span of the verse text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Annotation {
    pub rule: String,
    pub segment: String,
}

/// A user-owned pointer to a verse plus a free-text note.
///
/// An `id` of zero means the bookmark has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Bookmark {
    pub id: i64,
    pub user_id: String,
    pub chapter_id: i64,
    pub verse_number: i32,
    pub note: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<Chapter>,
}

/// The input of the add-bookmark use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    /// Supply an existing id to overwrite that bookmark in place.
    pub id: Option<i64>,
    pub user_id: String,
    pub chapter_id: i64,
    pub verse_number: i32,
    pub note: String,
}

/// Merged result of a search over both content kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResults {
    pub chapters: Vec<Chapter>,
    pub verses: Vec<Verse>,
}

impl Chapter {
    /// A copy of this chapter without its verses.
    pub fn summary(&self) -> Chapter {
        Chapter {
            verses: Vec::new(),
            ..self.clone()
        }
    }

    /// True if any display name contains `needle`, ignoring case.
    pub fn name_matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.name,
            &self.latin_name,
            &self.english_name,
            &self.localized_name,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl Verse {
    /// True if the translation or transliteration contains `needle`, ignoring case.
    pub fn text_matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.translation.to_lowercase().contains(&needle)
            || self.text_transliteration.to_lowercase().contains(&needle)
    }
}
