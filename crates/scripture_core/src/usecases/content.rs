//! crates/scripture_core/src/usecases/content.rs
//!
//! The read path for chapters and verses. Chapter reads go through the cache
//! first and fall back to the repository; cache faults only ever cost latency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, ALL_CHAPTERS_KEY, CHAPTER_KEY_PREFIX};
use crate::domain::{Chapter, SearchResults, Verse};
use crate::ports::{CacheStore, ContentRepository, NoCache, PortError, PortResult};
use crate::usecases::bounded;

/// Tunables of the content read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentPolicy {
    /// Lifetime of a cached chapter list or chapter detail.
    pub cache_ttl: Duration,
    /// Upper bound for every single store or cache call.
    pub store_timeout: Duration,
    /// Cap applied to both chapter and verse search results.
    pub search_limit: usize,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            store_timeout: Duration::from_secs(2),
            search_limit: 20,
        }
    }
}

#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepository>,
    cache: Arc<dyn CacheStore>,
    policy: ContentPolicy,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        cache: Arc<dyn CacheStore>,
        policy: ContentPolicy,
    ) -> Self {
        Self {
            content,
            cache,
            policy,
        }
    }

    /// A service whose cache always misses.
    pub fn uncached(content: Arc<dyn ContentRepository>, policy: ContentPolicy) -> Self {
        Self::new(content, Arc::new(NoCache), policy)
    }

    pub fn policy(&self) -> ContentPolicy {
        self.policy
    }

    pub async fn get_all_chapters(&self) -> PortResult<Vec<Chapter>> {
        let key = CacheKey::AllChapters;
        let load = async {
            let chapters = bounded(
                self.policy.store_timeout,
                "list chapters",
                self.content.list_all_chapters(),
            )
            .await?;
            Ok(CacheEntry::ChapterList(chapters))
        };

        match self.read_through(key, load).await? {
            CacheEntry::ChapterList(chapters) => Ok(chapters),
            CacheEntry::ChapterDetail(_) => Err(payload_mismatch(key)),
        }
    }

    pub async fn get_chapter_detail(&self, number: i32) -> PortResult<Chapter> {
        let key = CacheKey::Chapter(number);
        let load = async {
            let chapter = bounded(
                self.policy.store_timeout,
                "get chapter",
                self.content.get_chapter_by_number(number),
            )
            .await?;
            Ok(CacheEntry::ChapterDetail(chapter))
        };

        match self.read_through(key, load).await? {
            CacheEntry::ChapterDetail(chapter) => Ok(chapter),
            CacheEntry::ChapterList(_) => Err(payload_mismatch(key)),
        }
    }

    pub async fn get_verse_detail(&self, chapter_number: i32, verse_number: i32) -> PortResult<Verse> {
        bounded(
            self.policy.store_timeout,
            "get verse",
            self.content.get_verse(chapter_number, verse_number),
        )
        .await
    }

    /// Searches chapter names and verse texts at once. Fails as a whole if either side fails.
    pub async fn search(&self, text: &str) -> PortResult<SearchResults> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PortError::BadInput("search text must not be empty".to_string()));
        }

        let limit = self.policy.search_limit;
        let timeout = self.policy.store_timeout;
        let (chapters, verses) = futures::try_join!(
            bounded(timeout, "chapter search", self.content.search_chapters(text, limit)),
            bounded(timeout, "verse search", self.content.search_verses(text, limit)),
        )?;

        Ok(SearchResults { chapters, verses })
    }

    /// Drops the chapter list and every chapter detail from the cache.
    ///
    /// Returns how many per-chapter entries were removed.
    pub async fn invalidate_all(&self) -> PortResult<u64> {
        self.cache.delete(ALL_CHAPTERS_KEY).await?;
        let removed = self.cache.delete_prefix(CHAPTER_KEY_PREFIX).await?;
        info!(removed, "Content cache invalidated");
        Ok(removed)
    }

    //=====================================================================================
    // Read-through protocol
    //=====================================================================================

    /// Serves `key` from the cache, or awaits `load` and writes its result back.
    ///
    /// `load` is never polled on a hit.
    async fn read_through<F>(&self, key: CacheKey, load: F) -> PortResult<CacheEntry>
    where
        F: Future<Output = PortResult<CacheEntry>>,
    {
        if let Some(entry) = self.lookup(key).await {
            return Ok(entry);
        }

        let entry = load.await?;
        self.populate(key, &entry).await;
        Ok(entry)
    }

    async fn lookup(&self, key: CacheKey) -> Option<CacheEntry> {
        let raw_key = key.to_string();
        let cached = bounded(self.policy.store_timeout, "cache read", self.cache.get(&raw_key)).await;

        match cached {
            Ok(Some(raw)) => match CacheEntry::decode(key, &raw) {
                Ok(entry) => {
                    debug!(key = %raw_key, "Cache hit");
                    Some(entry)
                }
                Err(e) => {
                    warn!(key = %raw_key, error = %e, "Ignoring undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %raw_key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %raw_key, error = %e, "Cache read failed, reading from store");
                None
            }
        }
    }

    async fn populate(&self, key: CacheKey, entry: &CacheEntry) {
        let raw_key = key.to_string();
        let encoded = match entry.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %raw_key, error = %e, "Skipping cache write");
                return;
            }
        };

        let written = bounded(
            self.policy.store_timeout,
            "cache write",
            self.cache.set(&raw_key, &encoded, self.policy.cache_ttl),
        )
        .await;
        if let Err(e) = written {
            warn!(key = %raw_key, error = %e, "Cache write failed");
        }
    }
}

fn payload_mismatch(key: CacheKey) -> PortError {
    PortError::Unexpected(format!("cache entry under {} has the wrong shape", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_chapters, InMemoryCache, InMemoryContent};

    fn service(content: &Arc<InMemoryContent>, cache: &Arc<InMemoryCache>) -> ContentService {
        ContentService::new(content.clone(), cache.clone(), ContentPolicy::default())
    }

    fn fixtures() -> (Arc<InMemoryContent>, Arc<InMemoryCache>) {
        (
            Arc::new(InMemoryContent::with_sample_data()),
            Arc::new(InMemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn warm_reads_equal_cold_reads_and_skip_the_store() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        let cold = svc.get_chapter_detail(2).await.unwrap();
        assert_eq!(content.reads(), 1);
        assert!(cache.contains("content:chapter:2"));

        let warm = svc.get_chapter_detail(2).await.unwrap();
        assert_eq!(content.reads(), 1);
        assert_eq!(cold, warm);
        assert_eq!(warm.verses.len(), 2);
    }

    #[tokio::test]
    async fn chapter_list_is_cached_without_verses() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        let cold = svc.get_all_chapters().await.unwrap();
        let warm = svc.get_all_chapters().await.unwrap();

        assert_eq!(content.reads(), 1);
        assert_eq!(cold, warm);
        assert_eq!(
            cold.iter().map(|c| c.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(cold.iter().all(|c| c.verses.is_empty()));
        let cached: Vec<serde_json::Value> =
            serde_json::from_str(&cache.raw("content:chapters:all").unwrap()).unwrap();
        assert!(cached.iter().all(|c| c["verses"] == serde_json::json!([])));
    }

    #[tokio::test]
    async fn entries_are_written_with_the_configured_ttl() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        svc.get_all_chapters().await.unwrap();
        assert_eq!(
            cache.ttl("content:chapters:all"),
            Some(Duration::from_secs(86_400))
        );
    }

    #[tokio::test]
    async fn invalidation_exposes_store_changes() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        svc.get_all_chapters().await.unwrap();
        let before = svc.get_chapter_detail(1).await.unwrap();

        let mut changed = sample_chapters().remove(0);
        changed.english_name = "The Opener".to_string();
        content.replace_chapter(changed);

        // Still served from the cache until invalidated.
        assert_eq!(svc.get_chapter_detail(1).await.unwrap(), before);

        let removed = svc.invalidate_all().await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.is_empty());

        let after = svc.get_chapter_detail(1).await.unwrap();
        assert_eq!(after.english_name, "The Opener");
        let list = svc.get_all_chapters().await.unwrap();
        assert_eq!(list[0].english_name, "The Opener");
    }

    #[tokio::test]
    async fn invalidation_leaves_unrelated_keys_alone() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);
        cache.insert_raw("session:abc", "x");

        svc.get_chapter_detail(3).await.unwrap();
        svc.invalidate_all().await.unwrap();

        assert!(cache.contains("session:abc"));
        assert!(!cache.contains("content:chapter:3"));
    }

    #[tokio::test]
    async fn cache_failures_fall_back_to_the_store() {
        let (content, cache) = fixtures();
        cache.set_failing(true);
        let svc = service(&content, &cache);

        let first = svc.get_chapter_detail(1).await.unwrap();
        let second = svc.get_chapter_detail(1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(content.reads(), 2);
    }

    #[tokio::test]
    async fn undecodable_entries_are_replaced() {
        let (content, cache) = fixtures();
        cache.insert_raw("content:chapter:1", "{broken");
        let svc = service(&content, &cache);

        let chapter = svc.get_chapter_detail(1).await.unwrap();
        assert_eq!(chapter.latin_name, "Al-Fatihah");
        assert_eq!(content.reads(), 1);

        let repaired = cache.raw("content:chapter:1").unwrap();
        assert_eq!(
            CacheEntry::decode(CacheKey::Chapter(1), &repaired).unwrap(),
            CacheEntry::ChapterDetail(chapter)
        );
    }

    #[tokio::test]
    async fn unknown_numbers_are_not_found_and_not_cached() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        for number in [0, 115, -1] {
            let err = svc.get_chapter_detail(number).await.unwrap_err();
            assert!(matches!(err, PortError::NotFound(_)), "{number}: {err:?}");
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn store_errors_propagate_unchanged() {
        let (content, cache) = fixtures();
        content.set_failing(true);
        let svc = service(&content, &cache);

        let err = svc.get_all_chapters().await.unwrap_err();
        assert_eq!(err, PortError::Unexpected("store unavailable".to_string()));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_is_transparent() {
        let content = Arc::new(InMemoryContent::with_sample_data());
        let svc = ContentService::uncached(content.clone(), ContentPolicy::default());

        let first = svc.get_chapter_detail(1).await.unwrap();
        let second = svc.get_chapter_detail(1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(content.reads(), 2);
        assert_eq!(svc.invalidate_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn slow_store_reads_time_out() {
        let (content, cache) = fixtures();
        content.set_delay(Duration::from_millis(500));
        let policy = ContentPolicy {
            store_timeout: Duration::from_millis(20),
            ..ContentPolicy::default()
        };
        let svc = ContentService::new(content.clone(), cache.clone(), policy);

        let err = svc.get_chapter_detail(1).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn verses_resolve_within_their_chapter() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        let a = svc.get_verse_detail(2, 1).await.unwrap();
        let b = svc.get_verse_detail(3, 1).await.unwrap();
        assert_eq!(a.number, b.number);
        assert_ne!(a.id, b.id);
        assert_ne!(a.translation, b.translation);

        let err = svc.get_verse_detail(2, 99).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_rejects_blank_text_before_the_store() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        for text in ["", "   ", "\t\n"] {
            let err = svc.search(text).await.unwrap_err();
            assert!(matches!(err, PortError::BadInput(_)));
        }
        assert_eq!(content.reads(), 0);
    }

    #[tokio::test]
    async fn search_merges_both_kinds() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);

        let results = svc.search("fatihah").await.unwrap();
        assert_eq!(results.chapters.len(), 1);
        assert!(results
            .chapters
            .iter()
            .all(|c| c.latin_name.to_lowercase().contains("fatihah")));

        let results = svc.search("  alif lam  ").await.unwrap();
        assert!(results.chapters.is_empty());
        assert_eq!(results.verses.len(), 2);
        for verse in &results.verses {
            let parent = verse.chapter.as_ref().expect("parent chapter attached");
            assert_eq!(parent.id, verse.chapter_id);
            assert!(parent.verses.is_empty());
        }
    }

    #[tokio::test]
    async fn search_results_are_capped() {
        let (content, cache) = fixtures();
        let policy = ContentPolicy {
            search_limit: 1,
            ..ContentPolicy::default()
        };
        let svc = ContentService::new(content, cache, policy);

        let results = svc.search("a").await.unwrap();
        assert_eq!(results.chapters.len(), 1);
        assert_eq!(results.verses.len(), 1);
    }

    #[tokio::test]
    async fn search_fails_when_a_side_fails() {
        let (content, cache) = fixtures();
        content.set_failing(true);
        let svc = service(&content, &cache);

        assert!(matches!(
            svc.search("god").await,
            Err(PortError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn search_fails_when_only_verse_search_fails() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);
        assert_eq!(svc.search("fatihah").await.unwrap().chapters.len(), 1);

        content.set_verse_search_failing(true);
        assert!(matches!(
            svc.search("fatihah").await,
            Err(PortError::Unexpected(m)) if m == "verse search unavailable"
        ));
    }

    #[tokio::test]
    async fn search_fails_when_only_chapter_search_fails() {
        let (content, cache) = fixtures();
        let svc = service(&content, &cache);
        assert_eq!(svc.search("alif lam").await.unwrap().verses.len(), 2);

        content.set_chapter_search_failing(true);
        assert!(matches!(
            svc.search("alif lam").await,
            Err(PortError::Unexpected(m)) if m == "chapter search unavailable"
        ));
    }
}
