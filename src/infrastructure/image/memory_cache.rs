//! In-memory LRU image cache implementation.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, SharedImage};

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_SIZE: usize = 50;

/// In-memory LRU cache for decoded images, keyed by identifier and size.
///
/// Lookups take a short non-async lock so they are safe on a caller's thread.
pub struct MemoryImageCache {
    cache: Mutex<LruCache<CacheKey, SharedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the image for `key`, promoting it in the LRU order.
    pub fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        let mut cache = self.cache.lock();
        if let Some(img) = cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    /// Stores an image, evicting the least recently used entry when full.
    pub fn put(&self, key: CacheKey, image: SharedImage) {
        debug!(key = %key, "Storing image in memory cache");
        self.cache.lock().put(key, image);
    }

    /// Returns the current number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    pub fn clear(&self) {
        self.cache.lock().clear();
        debug!("Cleared memory image cache");
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn img(width: u32) -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(width, width))
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("test1", 0, 0);

        cache.put(key.clone(), img(100));
        let retrieved = cache.get(&key);

        assert_eq!(retrieved.map(|i| i.width()), Some(100));
    }

    #[test]
    fn test_sizes_are_separate_entries() {
        let cache = MemoryImageCache::new(10);
        cache.put(CacheKey::new("a", 0, 0), img(100));

        assert!(cache.get(&CacheKey::new("a", 50, 50)).is_none());
        assert!(cache.get(&CacheKey::new("a", 0, 0)).is_some());
    }

    #[test]
    fn test_cache_eviction() {
        let cache = MemoryImageCache::new(2);

        let k1 = CacheKey::native("test1");
        let k2 = CacheKey::native("test2");
        let k3 = CacheKey::native("test3");

        cache.put(k1.clone(), img(10));
        cache.put(k2.clone(), img(10));
        cache.put(k3.clone(), img(10));

        // k1 should be evicted (LRU)
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn test_repeated_put_is_idempotent() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("a", 8, 8);

        cache.put(key.clone(), img(8));
        cache.put(key.clone(), img(8));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).map(|i| i.width()), Some(8));
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::native("test1");

        cache.put(key.clone(), img(10));

        // Hit
        let _ = cache.get(&key);
        // Miss
        let _ = cache.get(&CacheKey::native("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!(stats.to_string().contains("50.0% hit rate"));
    }
}
