//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ContentRepository` and `BookmarkRepository` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scripture_core::domain::{Annotation, Bookmark, Chapter, Verse};
use scripture_core::ports::{BookmarkRepository, ContentRepository, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the content and bookmark ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Drops every table, including the migration ledger, so the next
    /// `run_migrations` rebuilds the schema from scratch.
    pub async fn reset_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DROP TABLE IF EXISTS bookmarks, verses, chapters, _sqlx_migrations CASCADE")
            .execute(&self.pool)
            .await?;
        info!("Database schema dropped");
        Ok(())
    }

    pub async fn chapter_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chapters")
            .fetch_one(&self.pool)
            .await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ChapterRecord {
    id: i64,
    number: i32,
    name: String,
    latin_name: String,
    english_name: String,
    localized_name: String,
    revelation_type: String,
    verse_count: i32,
}
impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            id: self.id,
            number: self.number,
            name: self.name,
            latin_name: self.latin_name,
            english_name: self.english_name,
            localized_name: self.localized_name,
            revelation_type: self.revelation_type,
            verse_count: self.verse_count,
            verses: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct VerseRecord {
    id: i64,
    chapter_id: i64,
    number: i32,
    text_original: String,
    text_transliteration: String,
    translation: String,
    exegesis: String,
    historical_note: Option<String>,
    annotations: Json<Vec<Annotation>>,
}
impl VerseRecord {
    fn to_domain(self) -> Verse {
        Verse {
            id: self.id,
            chapter_id: self.chapter_id,
            number: self.number,
            text_original: self.text_original,
            text_transliteration: self.text_transliteration,
            translation: self.translation,
            exegesis: self.exegesis,
            historical_note: self.historical_note,
            annotations: self.annotations.0,
            chapter: None,
        }
    }
}

/// The parent chapter columns of a joined row, selected with a `chapter_` prefix.
#[derive(FromRow)]
struct ParentChapterColumns {
    chapter_number: i32,
    chapter_name: String,
    chapter_latin_name: String,
    chapter_english_name: String,
    chapter_localized_name: String,
    chapter_revelation_type: String,
    chapter_verse_count: i32,
}
impl ParentChapterColumns {
    fn to_domain(self, id: i64) -> Chapter {
        Chapter {
            id,
            number: self.chapter_number,
            name: self.chapter_name,
            latin_name: self.chapter_latin_name,
            english_name: self.chapter_english_name,
            localized_name: self.chapter_localized_name,
            revelation_type: self.chapter_revelation_type,
            verse_count: self.chapter_verse_count,
            verses: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct VerseWithChapterRecord {
    #[sqlx(flatten)]
    verse: VerseRecord,
    #[sqlx(flatten)]
    chapter: ParentChapterColumns,
}
impl VerseWithChapterRecord {
    fn to_domain(self) -> Verse {
        let parent = self.chapter.to_domain(self.verse.chapter_id);
        Verse {
            chapter: Some(Box::new(parent)),
            ..self.verse.to_domain()
        }
    }
}

#[derive(FromRow)]
struct BookmarkRecord {
    id: i64,
    user_id: String,
    chapter_id: i64,
    verse_number: i32,
    note: String,
    created_at: DateTime<Utc>,
}
impl BookmarkRecord {
    fn to_domain(self) -> Bookmark {
        Bookmark {
            id: self.id,
            user_id: self.user_id,
            chapter_id: self.chapter_id,
            verse_number: self.verse_number,
            note: self.note,
            created_at: self.created_at,
            chapter: None,
        }
    }
}

#[derive(FromRow)]
struct BookmarkWithChapterRecord {
    #[sqlx(flatten)]
    bookmark: BookmarkRecord,
    #[sqlx(flatten)]
    chapter: ParentChapterColumns,
}
impl BookmarkWithChapterRecord {
    fn to_domain(self) -> Bookmark {
        let parent = self.chapter.to_domain(self.bookmark.chapter_id);
        Bookmark {
            chapter: Some(parent),
            ..self.bookmark.to_domain()
        }
    }
}

//=========================================================================================
// Query Helpers
//=========================================================================================

const PARENT_CHAPTER_COLUMNS: &str = "c.number AS chapter_number, c.name AS chapter_name, \
     c.latin_name AS chapter_latin_name, c.english_name AS chapter_english_name, \
     c.localized_name AS chapter_localized_name, c.revelation_type AS chapter_revelation_type, \
     c.verse_count AS chapter_verse_count";

const VERSE_COLUMNS: &str = "v.id, v.chapter_id, v.number, v.text_original, \
     v.text_transliteration, v.translation, v.exegesis, v.historical_note, v.annotations";

/// Builds an ILIKE pattern that matches `text` literally anywhere in a column.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

//=========================================================================================
// `ContentRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentRepository for DbAdapter {
    async fn list_all_chapters(&self) -> PortResult<Vec<Chapter>> {
        let records = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, number, name, latin_name, english_name, localized_name, revelation_type, verse_count \
             FROM chapters ORDER BY number ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_chapter_by_number(&self, number: i32) -> PortResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, number, name, latin_name, english_name, localized_name, revelation_type, verse_count \
             FROM chapters WHERE number = $1",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Chapter {} not found", number)))?;

        let sql = format!(
            "SELECT {} FROM verses v WHERE v.chapter_id = $1 ORDER BY v.number ASC",
            VERSE_COLUMNS
        );
        let verses = sqlx::query_as::<_, VerseRecord>(&sql)
            .bind(record.id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut chapter = record.to_domain();
        chapter.verses = verses.into_iter().map(|v| v.to_domain()).collect();
        Ok(chapter)
    }

    async fn search_chapters(&self, text: &str, limit: usize) -> PortResult<Vec<Chapter>> {
        let records = sqlx::query_as::<_, ChapterRecord>(
            "SELECT id, number, name, latin_name, english_name, localized_name, revelation_type, verse_count \
             FROM chapters \
             WHERE name ILIKE $1 OR latin_name ILIKE $1 OR english_name ILIKE $1 OR localized_name ILIKE $1 \
             ORDER BY number ASC LIMIT $2",
        )
        .bind(contains_pattern(text))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_verse(&self, chapter_number: i32, verse_number: i32) -> PortResult<Verse> {
        let sql = format!(
            "SELECT {} FROM verses v JOIN chapters c ON c.id = v.chapter_id \
             WHERE c.number = $1 AND v.number = $2",
            VERSE_COLUMNS
        );
        let record = sqlx::query_as::<_, VerseRecord>(&sql)
            .bind(chapter_number)
            .bind(verse_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::NotFound(format!(
                    "Verse {}:{} not found",
                    chapter_number, verse_number
                ))
            })?;

        Ok(record.to_domain())
    }

    async fn search_verses(&self, text: &str, limit: usize) -> PortResult<Vec<Verse>> {
        let sql = format!(
            "SELECT {}, {} FROM verses v JOIN chapters c ON c.id = v.chapter_id \
             WHERE v.translation ILIKE $1 OR v.text_transliteration ILIKE $1 \
             ORDER BY c.number ASC, v.number ASC LIMIT $2",
            VERSE_COLUMNS, PARENT_CHAPTER_COLUMNS
        );
        let records = sqlx::query_as::<_, VerseWithChapterRecord>(&sql)
            .bind(contains_pattern(text))
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `BookmarkRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookmarkRepository for DbAdapter {
    async fn save(&self, bookmark: Bookmark) -> PortResult<Bookmark> {
        // Parameters are positional, so the id (when present) is bound first.
        let query = if bookmark.id == 0 {
            sqlx::query_as::<_, BookmarkRecord>(
                "INSERT INTO bookmarks (user_id, chapter_id, verse_number, note) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, user_id, chapter_id, verse_number, note, created_at",
            )
        } else {
            sqlx::query_as::<_, BookmarkRecord>(
                "INSERT INTO bookmarks (id, user_id, chapter_id, verse_number, note) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET \
                    user_id = EXCLUDED.user_id, chapter_id = EXCLUDED.chapter_id, \
                    verse_number = EXCLUDED.verse_number, note = EXCLUDED.note \
                 RETURNING id, user_id, chapter_id, verse_number, note, created_at",
            )
            .bind(bookmark.id)
        };

        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let record = query
            .bind(&bookmark.user_id)
            .bind(bookmark.chapter_id)
            .bind(bookmark.verse_number)
            .bind(&bookmark.note)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    PortError::NotFound(format!("Chapter {} not found", bookmark.chapter_id))
                }
                _ => unexpected(e),
            })?;

        // A client-chosen id must never be handed out again by the sequence.
        if bookmark.id != 0 {
            sqlx::query(
                "SELECT setval(pg_get_serial_sequence('bookmarks', 'id'), \
                 GREATEST((SELECT MAX(id) FROM bookmarks), 1))",
            )
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn list_by_user(&self, user_id: &str) -> PortResult<Vec<Bookmark>> {
        let sql = format!(
            "SELECT b.id, b.user_id, b.chapter_id, b.verse_number, b.note, b.created_at, {} \
             FROM bookmarks b JOIN chapters c ON c.id = b.chapter_id \
             WHERE b.user_id = $1 ORDER BY b.created_at DESC, b.id DESC",
            PARENT_CHAPTER_COLUMNS
        );
        let records = sqlx::query_as::<_, BookmarkWithChapterRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete(&self, user_id: &str, chapter_id: i64, verse_number: i32) -> PortResult<u64> {
        let result = sqlx::query(
            "DELETE FROM bookmarks WHERE user_id = $1 AND chapter_id = $2 AND verse_number = $3",
        )
        .bind(user_id)
        .bind(chapter_id)
        .bind(verse_number)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(result.rows_affected())
    }

    async fn clear_all(&self, user_id: &str) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wildcards_are_matched_literally() {
        assert_eq!(contains_pattern("Fatihah"), "%Fatihah%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("c:\\"), "%c:\\\\%");
    }

    proptest! {
        #[test]
        fn escaped_pattern_has_no_bare_wildcards(text in ".*") {
            let pattern = contains_pattern(&text);
            let inner = &pattern[1..pattern.len() - 1];
            let mut chars = inner.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    let escaped = chars.next();
                    prop_assert!(matches!(escaped, Some('%' | '_' | '\\')));
                } else {
                    prop_assert!(ch != '%' && ch != '_');
                }
            }
        }
    }
}
