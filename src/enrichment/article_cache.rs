//! SQLite-backed cache of article lookups.
//!
//! Both found articles and confirmed-missing titles are stored so repeated runs
//! do not re-issue requests. Failed lookups are never cached.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

use super::article_source::ArticleSource;

/// Cached outcome of one `(language, title)` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Article(String),
    Missing,
}

pub struct ArticleCache {
    conn: Connection,
    ttl: Duration,
}

pub fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

impl ArticleCache {
    pub fn open(path: &Path, ttl_days: u32) -> Result<Self, String> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Could not create cache directory {}: {}",
                    parent.display(),
                    err
                )
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|err| format!("Could not open article cache {}: {}", path.display(), err))?;
        Self::with_connection(conn, ttl_days)
            .map_err(|err| format!("Could not initialize article cache: {err}"))
    }

    #[cfg(test)]
    pub fn open_in_memory(ttl_days: u32) -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?, ttl_days)
    }

    fn with_connection(conn: Connection, ttl_days: u32) -> Result<Self, rusqlite::Error> {
        let cache = Self {
            conn,
            ttl: Duration::from_secs(u64::from(ttl_days.max(1)) * 24 * 60 * 60),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS articles (
                language TEXT NOT NULL,
                title TEXT NOT NULL,
                found INTEGER NOT NULL,
                content TEXT,
                fetched_at_unix_ms INTEGER NOT NULL,
                PRIMARY KEY (language, title)
            )",
            [],
        )?;
        Ok(())
    }

    fn expiry_cutoff(&self, now_unix_ms: i64) -> i64 {
        now_unix_ms.saturating_sub(self.ttl.as_millis() as i64)
    }

    /// Returns a fresh entry, ignoring rows older than the TTL.
    pub fn lookup(
        &self,
        language: &str,
        title: &str,
        now_unix_ms: i64,
    ) -> Result<Option<CacheEntry>, rusqlite::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT found, content FROM articles
                 WHERE language = ?1 AND title = ?2 AND fetched_at_unix_ms > ?3",
                params![language, title, self.expiry_cutoff(now_unix_ms)],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(found, content)| match (found, content) {
            (true, Some(content)) => CacheEntry::Article(content),
            _ => CacheEntry::Missing,
        }))
    }

    pub fn store(
        &self,
        language: &str,
        title: &str,
        entry: &CacheEntry,
        now_unix_ms: i64,
    ) -> Result<(), rusqlite::Error> {
        let (found, content) = match entry {
            CacheEntry::Article(content) => (true, Some(content.as_str())),
            CacheEntry::Missing => (false, None),
        };
        self.conn.execute(
            "INSERT OR REPLACE INTO articles (language, title, found, content, fetched_at_unix_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![language, title, found, content, now_unix_ms],
        )?;
        Ok(())
    }

    /// Deletes rows older than the TTL and returns how many were removed.
    pub fn purge_expired(&self, now_unix_ms: i64) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "DELETE FROM articles WHERE fetched_at_unix_ms <= ?1",
            params![self.expiry_cutoff(now_unix_ms)],
        )
    }
}

/// Wraps another source and answers repeated lookups from the cache.
pub struct CachedArticleSource<S> {
    inner: S,
    cache: ArticleCache,
    hits: usize,
    misses: usize,
}

impl<S: ArticleSource> CachedArticleSource<S> {
    pub fn new(inner: S, cache: ArticleCache) -> Self {
        match cache.purge_expired(now_unix_ms()) {
            Ok(0) => {}
            Ok(removed) => debug!("Article cache: purged {} expired entries", removed),
            Err(err) => warn!("Article cache: failed to purge expired entries: {}", err),
        }
        Self {
            inner,
            cache,
            hits: 0,
            misses: 0,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<S: ArticleSource> ArticleSource for CachedArticleSource<S> {
    fn fetch_article(&mut self, title: &str, language: &str) -> Result<Option<String>, String> {
        let now = now_unix_ms();
        match self.cache.lookup(language, title, now) {
            Ok(Some(entry)) => {
                self.hits += 1;
                return Ok(match entry {
                    CacheEntry::Article(content) => Some(content),
                    CacheEntry::Missing => None,
                });
            }
            Ok(None) => {}
            Err(err) => warn!("Article cache lookup failed for {language}:{title}: {err}"),
        }

        self.misses += 1;
        let fetched = self.inner.fetch_article(title, language)?;
        let entry = match &fetched {
            Some(content) => CacheEntry::Article(content.clone()),
            None => CacheEntry::Missing,
        };
        if let Err(err) = self.cache.store(language, title, &entry, now) {
            warn!("Article cache store failed for {language}:{title}: {err}");
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArticleCache, CacheEntry, CachedArticleSource};
    use crate::enrichment::article_source::testing::FakeArticleSource;
    use crate::enrichment::article_source::ArticleSource;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn test_store_and_lookup_round_trip_found_and_missing() {
        let cache = ArticleCache::open_in_memory(30).expect("in-memory cache");
        let now = 100 * DAY_MS;

        cache
            .store("en", "Gasolin", &CacheEntry::Article("rock".to_string()), now)
            .expect("store article");
        cache
            .store("en", "Nobody", &CacheEntry::Missing, now)
            .expect("store missing");

        assert_eq!(
            cache.lookup("en", "Gasolin", now).expect("lookup"),
            Some(CacheEntry::Article("rock".to_string()))
        );
        assert_eq!(
            cache.lookup("en", "Nobody", now).expect("lookup"),
            Some(CacheEntry::Missing)
        );
        assert_eq!(cache.lookup("da", "Gasolin", now).expect("lookup"), None);
    }

    #[test]
    fn test_expired_entries_are_ignored_and_purged() {
        let cache = ArticleCache::open_in_memory(1).expect("in-memory cache");
        let stored_at = 10 * DAY_MS;
        cache
            .store("en", "Old", &CacheEntry::Article("stale".to_string()), stored_at)
            .expect("store");

        let later = stored_at + 2 * DAY_MS;
        assert_eq!(cache.lookup("en", "Old", later).expect("lookup"), None);
        assert_eq!(cache.purge_expired(later).expect("purge"), 1);
    }

    #[test]
    fn test_cached_source_fetches_each_title_once() {
        let inner = FakeArticleSource::default().with_page("en", "Strawbs", "folk band");
        let cache = ArticleCache::open_in_memory(30).expect("in-memory cache");
        let mut source = CachedArticleSource::new(inner, cache);

        for _ in 0..3 {
            assert_eq!(
                source.fetch_article("Strawbs", "en").expect("fetch"),
                Some("folk band".to_string())
            );
            assert_eq!(source.fetch_article("Ghost", "en").expect("fetch"), None);
        }

        assert_eq!(source.misses(), 2);
        assert_eq!(source.hits(), 4);
        assert_eq!(source.inner.calls.len(), 2);
    }

    #[test]
    fn test_cached_source_does_not_cache_failures() {
        let inner = FakeArticleSource::default().failing_on("Flaky");
        let cache = ArticleCache::open_in_memory(30).expect("in-memory cache");
        let mut source = CachedArticleSource::new(inner, cache);

        assert!(source.fetch_article("Flaky", "en").is_err());
        assert!(source.fetch_article("Flaky", "en").is_err());

        assert_eq!(source.inner.calls.len(), 2);
    }
}
