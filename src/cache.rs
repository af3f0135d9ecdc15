//! Bounded memoization for registry lookups
//!
//! A fixed-capacity LRU table shared by clones of the facade. The lock is
//! never held across an `.await`: two concurrent misses for the same key both
//! load and the last write wins, which is harmless because a load for a key
//! always produces an equivalent value.

use crate::error::Result;
use crate::types::PromptVersion;
use lru::LruCache;
use parking_lot::Mutex;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

/// Thread-safe LRU memo table; a capacity of zero disables it
pub struct MemoCache<K: Hash + Eq, V> {
    entries: Option<Arc<Mutex<LruCache<K, V>>>>,
}

impl<K: Hash + Eq, V: Clone> MemoCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Arc::new(Mutex::new(LruCache::new(cap)))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Look up a key, marking it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.as_ref()?.lock().get(key).cloned()
    }

    /// Store a value, evicting the least recently used entry when full
    pub fn insert(&self, key: K, value: V) {
        if let Some(entries) = &self.entries {
            entries.lock().put(key, value);
        }
    }

    /// Return the cached value or run `load` and remember its success.
    ///
    /// Errors are returned as-is and never cached.
    pub async fn get_or_try_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.get(&key) {
            trace!("memo cache hit");
            return Ok(hit);
        }

        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }
}

impl<K: Hash + Eq, V> Clone for MemoCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("capacity", &self.entries.as_ref().map(|e| e.lock().cap()))
            .finish()
    }
}

/// Arguments of a prompt lookup, used as the memo key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptCacheKey {
    pub name_or_uri: String,
    pub version: Option<u64>,
    pub allow_missing: bool,
}

impl PromptCacheKey {
    pub fn new(name_or_uri: impl Into<String>, version: Option<u64>, allow_missing: bool) -> Self {
        Self {
            name_or_uri: name_or_uri.into(),
            version,
            allow_missing,
        }
    }
}

/// Prompt lookups; `None` values record a prompt that was missing at load time
pub type PromptCache = MemoCache<PromptCacheKey, Option<PromptVersion>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_evicts_least_recently_used() {
        let cache: MemoCache<&str, u32> = MemoCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));

        cache.insert("c", 3);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache: MemoCache<&str, u32> = MemoCache::new(0);
        cache.insert("a", 1);
        assert!(!cache.is_enabled());
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: MemoCache<&str, u32> = MemoCache::new(4);
        let other = cache.clone();
        cache.insert("a", 1);
        assert_eq!(other.get(&"a"), Some(1));
        other.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_try_load_memoizes_success() {
        let cache: MemoCache<String, u32> = MemoCache::new(4);
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_load("k".to_string(), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_try_load_does_not_cache_errors() {
        let cache: MemoCache<String, u32> = MemoCache::new(4);

        let err = cache
            .get_or_try_load("k".to_string(), || async { Err(Error::not_found("k")) })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());

        let value = cache
            .get_or_try_load("k".to_string(), || async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn test_get_or_try_load_needs_no_runtime() {
        let cache: MemoCache<&str, u32> = MemoCache::new(1);
        let value = tokio_test::block_on(cache.get_or_try_load("k", || async { Ok(3) }));
        assert_eq!(value.unwrap(), 3);
        assert_eq!(cache.get(&"k"), Some(3));
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let cache: PromptCache = MemoCache::new(8);
        cache.insert(PromptCacheKey::new("p", Some(1), false), None);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(&PromptCacheKey::new("p", Some(1), false)) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(None));
        }
    }
}
