//! TTL cache for workload results
//!
//! The policy is unbounded and TTL-only: entries are checked for expiry when
//! they are read and are otherwise kept until overwritten or the process
//! exits. Memory grows with the number of distinct keys seen, so this cache is
//! only suitable for the bounded key space of the demo endpoint. Each process
//! owns its own instance; replicas do not share results.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached results
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: u64,
    expires_at: Instant,
}

/// Thread-safe result cache with per-entry expiry
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Look up a live entry. Entries whose expiry is at or before now are absent.
    pub fn get(&self, key: &str) -> Option<u64> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value)
        } else {
            None
        }
    }

    /// Insert or overwrite an entry
    pub fn set(&self, key: impl Into<String>, value: u64, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_before_expiry() {
        let cache = ResultCache::new();
        cache.set("after:1000:4", 42, DEFAULT_TTL);

        assert_eq!(cache.get("after:1000:4"), Some(42));
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("after:1000:4"), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_at_exact_deadline() {
        let cache = ResultCache::new();
        cache.set("k", 1, DEFAULT_TTL);

        tokio::time::advance(DEFAULT_TTL).await;
        assert_eq!(cache.get("k"), None);
        // lazily expired, not removed
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes_expiry() {
        let cache = ResultCache::new();
        cache.set("k", 1, DEFAULT_TTL);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("k"), None);

        cache.set("k", 2, DEFAULT_TTL);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let cache = ResultCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("nope"), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_live() {
        let cache = ResultCache::new();
        cache.set("k", 7, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }
}
