//! services/api/src/adapters/seeder.rs
//!
//! Loads chapter files (one JSON document per chapter, verses nested) into an
//! empty database at startup.

use crate::adapters::db::DbAdapter;
use crate::error::ApiError;
use scripture_core::domain::Annotation;
use serde::Deserialize;
use sqlx::types::Json;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct SeedChapter {
    pub number: i32,
    pub name: String,
    pub latin_name: String,
    pub english_name: String,
    #[serde(default)]
    pub localized_name: String,
    pub revelation_type: String,
    /// Falls back to the number of nested verses.
    #[serde(default)]
    pub verse_count: Option<i32>,
    #[serde(default)]
    pub verses: Vec<SeedVerse>,
}

#[derive(Debug, Deserialize)]
pub struct SeedVerse {
    pub number: i32,
    pub text_original: String,
    pub text_transliteration: String,
    pub translation: String,
    #[serde(default)]
    pub exegesis: String,
    #[serde(default)]
    pub historical_note: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

pub fn parse_seed(raw: &str) -> Result<SeedChapter, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Every `*.json` file directly inside `dir`, ordered by file name.
pub async fn seed_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Seeds the content tables when they are empty. Returns how many chapters were inserted.
///
/// Files that cannot be read or parsed are skipped; a failed insert aborts seeding.
pub async fn seed_content(db: &DbAdapter, dir: &Path) -> Result<usize, ApiError> {
    if db.chapter_count().await? > 0 {
        info!("Chapters already seeded, skipping...");
        return Ok(0);
    }

    let files = match seed_files(dir).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Cannot list seed directory {}: {}", dir.display(), e);
            return Ok(0);
        }
    };
    if files.is_empty() {
        info!("No seed files found in {}", dir.display());
        return Ok(0);
    }

    info!(files_found = files.len(), "Start seeding chapters...");
    let mut seeded = 0;
    for file in files {
        let raw = match tokio::fs::read_to_string(&file).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to read seed file {}: {}", file.display(), e);
                continue;
            }
        };
        let chapter = match parse_seed(&raw) {
            Ok(chapter) => chapter,
            Err(e) => {
                error!("Failed to parse seed file {}: {}", file.display(), e);
                continue;
            }
        };

        insert_chapter(db, &chapter).await?;
        info!("Seeded: {}", chapter.latin_name);
        seeded += 1;
    }

    info!(seeded, "Database seeding completed.");
    Ok(seeded)
}

async fn insert_chapter(db: &DbAdapter, chapter: &SeedChapter) -> Result<(), sqlx::Error> {
    let mut tx = db.pool().begin().await?;

    let verse_count = chapter
        .verse_count
        .unwrap_or(chapter.verses.len() as i32);
    let chapter_id: i64 = sqlx::query_scalar(
        "INSERT INTO chapters (number, name, latin_name, english_name, localized_name, revelation_type, verse_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(chapter.number)
    .bind(&chapter.name)
    .bind(&chapter.latin_name)
    .bind(&chapter.english_name)
    .bind(&chapter.localized_name)
    .bind(&chapter.revelation_type)
    .bind(verse_count)
    .fetch_one(&mut *tx)
    .await?;

    for verse in &chapter.verses {
        sqlx::query(
            "INSERT INTO verses (chapter_id, number, text_original, text_transliteration, translation, exegesis, historical_note, annotations) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(chapter_id)
        .bind(verse.number)
        .bind(&verse.text_original)
        .bind(&verse.text_transliteration)
        .bind(&verse.translation)
        .bind(&verse.exegesis)
        .bind(&verse.historical_note)
        .bind(Json(&verse.annotations))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_chapter_with_nested_verses() {
        let raw = r#"{
            "number": 1,
            "name": "الفاتحة",
            "latin_name": "Al-Fatihah",
            "english_name": "The Opening",
            "localized_name": "Pembukaan",
            "revelation_type": "Meccan",
            "verses": [
                {
                    "number": 1,
                    "text_original": "بِسْمِ اللّٰهِ",
                    "text_transliteration": "bismillahir rahmanir rahim",
                    "translation": "In the name of God",
                    "annotations": [{ "rule": "idgham", "segment": "rahmanir" }]
                }
            ]
        }"#;

        let chapter = parse_seed(raw).unwrap();
        assert_eq!(chapter.number, 1);
        assert_eq!(chapter.verse_count, None);
        assert_eq!(chapter.verses.len(), 1);
        let verse = &chapter.verses[0];
        assert_eq!(verse.exegesis, "");
        assert_eq!(verse.historical_note, None);
        assert_eq!(verse.annotations[0].rule, "idgham");
    }

    #[test]
    fn rejects_files_without_required_names() {
        assert!(parse_seed(r#"{ "number": 2, "revelation_type": "Medinan" }"#).is_err());
    }

    #[test]
    fn bundled_seed_files_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds/data");
        let files = std::fs::read_dir(&dir).unwrap();
        let mut parsed = 0;
        for entry in files {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let raw = std::fs::read_to_string(&path).unwrap();
                let chapter = parse_seed(&raw).unwrap();
                assert!(!chapter.verses.is_empty(), "{}", path.display());
                parsed += 1;
            }
        }
        assert!(parsed > 0);
    }
}
