//! Default two-tier cache: memory LRU in front of a disk directory.

use std::sync::Arc;

use tracing::{debug, warn};

use super::decode::encode_png;
use super::disk_cache::{DiskImageCache, default_cache_dir};
use super::memory_cache::{CacheStats, MemoryImageCache};
use crate::domain::entities::{CacheKey, SharedImage};
use crate::domain::errors::LoadError;
use crate::domain::ports::{CacheResult, ImageCachePort};
use crate::infrastructure::config::LoaderConfig;

/// Memory tier for decoded, sized images and disk tier for undecoded bytes.
pub struct TieredImageCache {
    memory: MemoryImageCache,
    disk: DiskImageCache,
}

impl TieredImageCache {
    /// Combines the two tiers.
    #[must_use]
    pub const fn new(memory: MemoryImageCache, disk: DiskImageCache) -> Self {
        Self { memory, disk }
    }

    /// Opens the cache described by the loader configuration.
    ///
    /// # Errors
    /// Returns error if the disk cache directory cannot be created.
    pub async fn open(config: &LoaderConfig) -> CacheResult<Self> {
        let dir = config.cache_dir.clone().unwrap_or_else(default_cache_dir);
        let disk = DiskImageCache::new(dir, config.disk_cache_size).await?;
        Ok(Self::new(MemoryImageCache::new(config.memory_cache_size), disk))
    }

    /// Returns memory tier statistics.
    #[must_use]
    pub fn memory_stats(&self) -> CacheStats {
        self.memory.stats()
    }

    /// Returns the disk tier.
    #[must_use]
    pub const fn disk(&self) -> &DiskImageCache {
        &self.disk
    }
}

#[async_trait::async_trait]
impl ImageCachePort for TieredImageCache {
    fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        self.memory.get(key)
    }

    async fn get_from_disk(&self, key: &CacheKey) -> CacheResult<Option<SharedImage>> {
        self.disk.get_sized(key).await
    }

    async fn put(&self, key: CacheKey, image: SharedImage) -> CacheResult<()> {
        self.memory.put(key.clone(), Arc::clone(&image));

        // The disk file is shared by every size of an identifier, so only a
        // native-size image may become it, and never over an existing copy.
        if !key.is_native() || self.disk.contains(key.identifier()).await {
            return Ok(());
        }

        let encoded = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| LoadError::cache(format!("Encode task panicked: {e}")))??;
        self.disk.put_bytes(key.identifier(), &encoded).await?;
        debug!(key = %key, "Persisted decoded image to disk cache");
        Ok(())
    }

    async fn put_raw(&self, identifier: &str, bytes: &[u8]) -> CacheResult<()> {
        self.disk.put_bytes(identifier, bytes).await
    }

    async fn clear(&self) -> CacheResult<()> {
        self.memory.clear();
        if let Err(e) = self.disk.clear().await {
            warn!(error = %e, "Failed to clear disk cache");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use image::DynamicImage;
    use tempfile::TempDir;

    use super::*;

    async fn create_test_cache() -> Result<(TieredImageCache, TempDir), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let disk = DiskImageCache::new(temp_dir.path().to_path_buf(), 1024 * 1024).await?;
        Ok((TieredImageCache::new(MemoryImageCache::new(8), disk), temp_dir))
    }

    #[tokio::test]
    async fn test_put_fills_both_tiers() -> Result<(), Box<dyn std::error::Error>> {
        let (cache, _temp) = create_test_cache().await?;
        let key = CacheKey::native("a.png");

        cache.put(key.clone(), Arc::new(DynamicImage::new_rgb8(12, 12))).await?;

        assert_eq!(cache.get(&key).map(|i| i.width()), Some(12));
        assert!(cache.disk().contains("a.png").await);
        let from_disk = cache.get_from_disk(&key).await?;
        assert_eq!(from_disk.map(|i| i.width()), Some(12));
        Ok(())
    }

    #[tokio::test]
    async fn test_put_keeps_existing_raw_copy() -> Result<(), Box<dyn std::error::Error>> {
        let (cache, _temp) = create_test_cache().await?;
        let raw = encode_png(&DynamicImage::new_rgb8(64, 64))?;
        cache.put_raw("a.png", &raw).await?;

        let small = CacheKey::new("a.png", 16, 16);
        cache.put(small, Arc::new(DynamicImage::new_rgb8(16, 16))).await?;

        let native = cache.get_from_disk(&CacheKey::native("a.png")).await?;
        assert_eq!(native.map(|i| i.width()), Some(64));
        Ok(())
    }

    #[tokio::test]
    async fn test_sized_put_stays_out_of_disk_tier() -> Result<(), Box<dyn std::error::Error>> {
        let (cache, _temp) = create_test_cache().await?;
        let sized = CacheKey::new("a.png", 16, 16);

        cache.put(sized.clone(), Arc::new(DynamicImage::new_rgb8(16, 16))).await?;

        assert_eq!(cache.get(&sized).map(|i| i.width()), Some(16));
        assert!(!cache.disk().contains("a.png").await);
        assert!(cache.get_from_disk(&CacheKey::native("a.png")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_direct_decode_keeps_native_distinct() -> Result<(), Box<dyn std::error::Error>> {
        use crate::domain::ports::mock::MockFetcher;
        use crate::infrastructure::image::loader::FetchPipeline;

        let (cache, _temp) = create_test_cache().await?;
        let png = encode_png(&DynamicImage::new_rgb8(64, 64))?;
        let fetcher = Arc::new(MockFetcher::new().with_body("a.png", png));
        let pipeline = FetchPipeline::new(Arc::new(cache), fetcher.clone(), false);

        let sized = pipeline.resolve(&CacheKey::new("a.png", 16, 16)).await?;
        let native = pipeline.resolve(&CacheKey::native("a.png")).await?;

        assert_eq!(sized.image.width(), 16);
        assert_eq!(native.image.width(), 64);
        assert_eq!(fetcher.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_put_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let (cache, _temp) = create_test_cache().await?;
        let key = CacheKey::native("a.png");
        let image = Arc::new(DynamicImage::new_rgb8(4, 4));

        cache.put(key.clone(), Arc::clone(&image)).await?;
        let first = cache.get(&key).map(|i| (i.width(), i.height()));
        cache.put(key.clone(), image).await?;
        let second = cache.get(&key).map(|i| (i.width(), i.height()));

        assert_eq!(first, second);
        assert_eq!(cache.disk().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() -> Result<(), Box<dyn std::error::Error>> {
        let (cache, _temp) = create_test_cache().await?;
        let key = CacheKey::native("a.png");
        cache.put(key.clone(), Arc::new(DynamicImage::new_rgb8(2, 2))).await?;

        cache.clear().await?;

        assert!(cache.get(&key).is_none());
        assert!(cache.disk().is_empty());
        assert_eq!(cache.memory_stats().size, 0);
        Ok(())
    }
}
