//! crates/scripture_core/src/testing.rs
//!
//! In-memory implementations of the ports, used by unit tests here and by the
//! `api` crate's handler tests (through the `testing` feature).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{Annotation, Bookmark, Chapter, Verse};
use crate::ports::{BookmarkRepository, CacheStore, ContentRepository, PortError, PortResult};

//=========================================================================================
// Sample Content
//=========================================================================================

fn verse(chapter_id: i64, number: i32, transliteration: &str, translation: &str) -> Verse {
    Verse {
        id: chapter_id * 1000 + number as i64,
        chapter_id,
        number,
        text_original: format!("original {}:{}", chapter_id, number),
        text_transliteration: transliteration.to_string(),
        translation: translation.to_string(),
        exegesis: format!("exegesis of {}:{}", chapter_id, number),
        historical_note: None,
        annotations: vec![Annotation {
            rule: "ikhfa".to_string(),
            segment: transliteration.split(' ').next().unwrap_or_default().to_string(),
        }],
        chapter: None,
    }
}

/// Three small chapters, each with a distinct verse 1.
pub fn sample_chapters() -> Vec<Chapter> {
    let fatihah = vec![
        verse(1, 1, "bismillahir rahmanir rahim", "In the name of God, the Most Gracious, the Most Merciful"),
        verse(1, 2, "alhamdu lillahi rabbil alamin", "All praise is for God, Lord of all worlds"),
    ];
    let baqarah = vec![
        verse(2, 1, "alif lam mim", "Alif, Lam, Mim"),
        verse(2, 2, "dhalika al-kitabu la rayba fih", "This is the Book about which there is no doubt"),
    ];
    let imran = vec![verse(3, 1, "alif lam mim allahu", "Alif, Lam, Mim. God, there is no deity except Him")];

    vec![
        Chapter {
            id: 1,
            number: 1,
            name: "الفاتحة".to_string(),
            latin_name: "Al-Fatihah".to_string(),
            english_name: "The Opening".to_string(),
            localized_name: "Pembukaan".to_string(),
            revelation_type: "Meccan".to_string(),
            verse_count: fatihah.len() as i32,
            verses: fatihah,
        },
        Chapter {
            id: 2,
            number: 2,
            name: "البقرة".to_string(),
            latin_name: "Al-Baqarah".to_string(),
            english_name: "The Cow".to_string(),
            localized_name: "Sapi Betina".to_string(),
            revelation_type: "Medinan".to_string(),
            verse_count: baqarah.len() as i32,
            verses: baqarah,
        },
        Chapter {
            id: 3,
            number: 3,
            name: "آل عمران".to_string(),
            latin_name: "Ali 'Imran".to_string(),
            english_name: "Family of Imran".to_string(),
            localized_name: "Keluarga Imran".to_string(),
            revelation_type: "Medinan".to_string(),
            verse_count: imran.len() as i32,
            verses: imran,
        },
    ]
}

//=========================================================================================
// In-Memory Content Repository
//=========================================================================================

/// Counts every call so tests can tell whether the store was touched.
#[derive(Default)]
pub struct InMemoryContent {
    chapters: Mutex<Vec<Chapter>>,
    reads: AtomicUsize,
    failing: AtomicBool,
    chapter_search_failing: AtomicBool,
    verse_search_failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryContent {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters: Mutex::new(chapters),
            ..Self::default()
        }
    }

    pub fn with_sample_data() -> Self {
        Self::new(sample_chapters())
    }

    /// Replaces the chapter with the same number.
    pub fn replace_chapter(&self, chapter: Chapter) {
        let mut chapters = self.chapters.lock().unwrap();
        if let Some(slot) = chapters.iter_mut().find(|c| c.number == chapter.number) {
            *slot = chapter;
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fails `search_chapters` alone, leaving every other call working.
    pub fn set_chapter_search_failing(&self, failing: bool) {
        self.chapter_search_failing.store(failing, Ordering::SeqCst);
    }

    /// Fails `search_verses` alone, leaving every other call working.
    pub fn set_verse_search_failing(&self, failing: bool) {
        self.verse_search_failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every call sleep before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn enter(&self) -> PortResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for InMemoryContent {
    async fn list_all_chapters(&self) -> PortResult<Vec<Chapter>> {
        self.enter().await?;
        let mut chapters: Vec<Chapter> =
            self.chapters.lock().unwrap().iter().map(Chapter::summary).collect();
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn get_chapter_by_number(&self, number: i32) -> PortResult<Chapter> {
        self.enter().await?;
        self.chapters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.number == number)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Chapter {} not found", number)))
    }

    async fn search_chapters(&self, text: &str, limit: usize) -> PortResult<Vec<Chapter>> {
        self.enter().await?;
        if self.chapter_search_failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("chapter search unavailable".to_string()));
        }
        Ok(self
            .chapters
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name_matches(text))
            .map(Chapter::summary)
            .take(limit)
            .collect())
    }

    async fn get_verse(&self, chapter_number: i32, verse_number: i32) -> PortResult<Verse> {
        self.enter().await?;
        self.chapters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.number == chapter_number)
            .and_then(|c| c.verses.iter().find(|v| v.number == verse_number))
            .cloned()
            .ok_or_else(|| {
                PortError::NotFound(format!("Verse {}:{} not found", chapter_number, verse_number))
            })
    }

    async fn search_verses(&self, text: &str, limit: usize) -> PortResult<Vec<Verse>> {
        self.enter().await?;
        if self.verse_search_failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("verse search unavailable".to_string()));
        }
        let chapters = self.chapters.lock().unwrap();
        Ok(chapters
            .iter()
            .flat_map(|c| {
                c.verses.iter().filter(|v| v.text_matches(text)).map(move |v| Verse {
                    chapter: Some(Box::new(c.summary())),
                    ..v.clone()
                })
            })
            .take(limit)
            .collect())
    }
}

//=========================================================================================
// In-Memory Bookmark Repository
//=========================================================================================

#[derive(Default)]
pub struct InMemoryBookmarks {
    rows: Mutex<Vec<Bookmark>>,
    next_id: AtomicUsize,
    chapters: Vec<Chapter>,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryBookmarks {
    /// `chapters` plays the role of the foreign-key target.
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters: chapters.iter().map(Chapter::summary).collect(),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<Bookmark> {
        self.rows.lock().unwrap().clone()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryBookmarks {
    async fn save(&self, mut bookmark: Bookmark) -> PortResult<Bookmark> {
        self.pause().await;
        if !self.chapters.iter().any(|c| c.id == bookmark.chapter_id) {
            return Err(PortError::NotFound(format!(
                "Chapter {} not found",
                bookmark.chapter_id
            )));
        }
        let mut rows = self.rows.lock().unwrap();
        if bookmark.id == 0 {
            bookmark.id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
            // Spread creation times so newest-first ordering is observable.
            bookmark.created_at = Utc::now() + ChronoDuration::milliseconds(bookmark.id);
            rows.push(bookmark.clone());
        } else if let Some(existing) = rows.iter_mut().find(|b| b.id == bookmark.id) {
            bookmark.created_at = existing.created_at;
            *existing = bookmark.clone();
        } else {
            // Same as the store: later generated ids skip past explicit ones.
            self.next_id.fetch_max(bookmark.id as usize, Ordering::SeqCst);
            rows.push(bookmark.clone());
        }
        Ok(bookmark)
    }

    async fn list_by_user(&self, user_id: &str) -> PortResult<Vec<Bookmark>> {
        self.pause().await;
        let mut found: Vec<Bookmark> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| Bookmark {
                chapter: self.chapters.iter().find(|c| c.id == b.chapter_id).cloned(),
                ..b.clone()
            })
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn delete(&self, user_id: &str, chapter_id: i64, verse_number: i32) -> PortResult<u64> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| {
            !(b.user_id == user_id && b.chapter_id == chapter_id && b.verse_number == verse_number)
        });
        Ok((before - rows.len()) as u64)
    }

    async fn clear_all(&self, user_id: &str) -> PortResult<u64> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}

//=========================================================================================
// In-Memory Cache
//=========================================================================================

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
    failing: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    /// Stores bytes directly, bypassing any encoder.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Duration::from_secs(60)));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> PortResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("cache unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> PortResult<u64> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn flush_all(&self) -> PortResult<()> {
        self.check()?;
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}
