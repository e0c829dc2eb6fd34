//! In-process cache of fully rendered pages.
//!
//! Entries expire after a fixed TTL. There is no invalidation on writes; a
//! cached page may be stale for up to one TTL. [`PageCache::clear`] drops
//! everything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use tokio::sync::RwLock;

/// A rendered response kept by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct Entry {
    page: CachedPage,
    deadline: Instant,
}

/// Shared TTL cache of rendered pages.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl PageCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a cache from a TTL in seconds.
    #[must_use]
    pub fn from_secs(ttl_secs: u64) -> Self {
        Self::new(Duration::from_secs(ttl_secs))
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the cache key for a request.
    ///
    /// The whole `Cookie` header is part of the key, so each session gets its
    /// own copy of a page.
    #[must_use]
    pub fn key_for(path: &str, query: Option<&str>, cookie: Option<&str>) -> String {
        format!(
            "{path}?{}#{}",
            query.unwrap_or_default(),
            cookie.unwrap_or_default()
        )
    }

    /// Look up a live entry.
    pub async fn get(&self, key: &str) -> Option<CachedPage> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.deadline > Instant::now())
            .map(|entry| entry.page.clone())
    }

    /// Store a page, replacing any previous entry for the key.
    pub async fn insert(&self, key: String, page: CachedPage) {
        let deadline = Instant::now() + self.ttl;
        self.entries
            .write()
            .await
            .insert(key, Entry { page, deadline });
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        tracing::info!(dropped, "Page cache cleared");
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.deadline > now);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(body: &'static str) -> CachedPage {
        CachedPage {
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_key_varies_on_query_and_cookie() {
        let anon = PageCache::key_for("/", None, None);
        let paged = PageCache::key_for("/", Some("page=2"), None);
        let alice = PageCache::key_for("/", None, Some("sessionid=a"));
        let bob = PageCache::key_for("/", None, Some("sessionid=b"));

        assert_ne!(anon, paged);
        assert_ne!(anon, alice);
        assert_ne!(alice, bob);
        assert_eq!(alice, PageCache::key_for("/", None, Some("sessionid=a")));
    }

    #[tokio::test]
    async fn test_get_returns_inserted_page() {
        let cache = PageCache::from_secs(20);
        assert!(cache.get("k").await.is_none());

        cache.insert("k".to_string(), page("hello")).await;
        assert_eq!(cache.get("k").await.unwrap().body, Bytes::from_static(b"hello"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = PageCache::new(Duration::from_millis(30));
        cache.insert("k".to_string(), page("hello")).await;

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = PageCache::from_secs(20);
        cache.insert("a".to_string(), page("a")).await;
        cache.insert("b".to_string(), page("b")).await;

        cache.clear().await;

        assert!(cache.get("a").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = PageCache::from_secs(20);
        let other = cache.clone();
        cache.insert("k".to_string(), page("shared")).await;
        assert!(other.get("k").await.is_some());
    }
}
