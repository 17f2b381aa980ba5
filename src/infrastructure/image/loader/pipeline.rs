//! Memory -> Disk -> Network resolution for one identifier.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::domain::entities::{CacheKey, ImageSource, LoadOutcome, LoadedImage, SharedImage};
use crate::domain::errors::LoadError;
use crate::domain::ports::{ImageCachePort, ImageFetchPort};
use crate::infrastructure::image::decode::decode_sized_blocking;

/// Pipeline states. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Query the memory tier.
    MemoryCheck,
    /// Query the durable tier.
    DiskCheck,
    /// Download and decode.
    NetworkFetch,
    /// An image was produced.
    Done,
    /// Resolution failed.
    Failed,
}

impl FetchState {
    /// State entered when the current tier misses.
    #[must_use]
    pub const fn on_miss(self) -> Self {
        match self {
            Self::MemoryCheck => Self::DiskCheck,
            Self::DiskCheck => Self::NetworkFetch,
            Self::NetworkFetch | Self::Failed => Self::Failed,
            Self::Done => Self::Done,
        }
    }

    /// Returns true for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    const fn source(self) -> ImageSource {
        match self {
            Self::MemoryCheck => ImageSource::Memory,
            Self::DiskCheck => ImageSource::Disk,
            Self::NetworkFetch | Self::Done | Self::Failed => ImageSource::Network,
        }
    }
}

/// Resolves single identifiers against the cache port and the network.
pub struct FetchPipeline {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ImageFetchPort>,
    persist_raw: bool,
}

impl FetchPipeline {
    /// Creates a pipeline over the given ports.
    ///
    /// With `persist_raw`, downloads are written to durable storage first and
    /// decoded from the stored copy.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn ImageFetchPort>,
        persist_raw: bool,
    ) -> Self {
        Self {
            cache,
            fetcher,
            persist_raw,
        }
    }

    /// The cache this pipeline reads and fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ImageCachePort> {
        &self.cache
    }

    /// `MemoryCheck`. Never blocks, so it may run on the caller's thread.
    #[must_use]
    pub fn check_memory(&self, key: &CacheKey) -> LoadOutcome {
        self.cache
            .get(key)
            .map_or(LoadOutcome::Miss, LoadOutcome::Hit)
    }

    /// Walks every tier from `MemoryCheck`. Memory is checked again because
    /// another task may have filled it since the caller's check.
    ///
    /// A non-terminal failure falls through to the next tier.
    ///
    /// # Errors
    /// Returns `NetworkFailure` or `DecodeFailure` from the network tier.
    pub async fn resolve(&self, key: &CacheKey) -> Result<LoadedImage, LoadError> {
        let mut state = FetchState::MemoryCheck;
        let mut produced: Option<(ImageSource, SharedImage)> = None;
        let mut cause: Option<LoadError> = None;

        while !state.is_terminal() {
            trace!(key = %key, state = ?state, "Pipeline step");
            let outcome = match state {
                FetchState::MemoryCheck => self.check_memory(key),
                FetchState::DiskCheck => self.check_disk(key).await,
                FetchState::NetworkFetch => self.fetch_network(key).await,
                FetchState::Done | FetchState::Failed => break,
            };

            state = match outcome {
                LoadOutcome::Hit(image) => {
                    produced = Some((state.source(), image));
                    FetchState::Done
                }
                LoadOutcome::Miss => state.on_miss(),
                LoadOutcome::Failure(e) if !e.is_terminal() => {
                    warn!(key = %key, state = ?state, error = %e, "Tier unavailable, falling through");
                    state.on_miss()
                }
                LoadOutcome::Failure(e) => {
                    cause = Some(e);
                    FetchState::Failed
                }
            };
        }

        match produced {
            Some((source, image)) => {
                debug!(key = %key, source = %source, "Image resolved");
                Ok(LoadedImage {
                    key: key.clone(),
                    image,
                    source,
                })
            }
            None => Err(cause.unwrap_or_else(|| {
                LoadError::network(format!("No tier produced {}", key.identifier()))
            })),
        }
    }

    /// `DiskCheck`.
    async fn check_disk(&self, key: &CacheKey) -> LoadOutcome {
        match self.cache.get_from_disk(key).await {
            Ok(Some(image)) => {
                self.store(key, Arc::clone(&image)).await;
                LoadOutcome::Hit(image)
            }
            Ok(None) => LoadOutcome::Miss,
            Err(e) => LoadOutcome::Failure(e),
        }
    }

    /// `NetworkFetch`. One attempt, no retry.
    async fn fetch_network(&self, key: &CacheKey) -> LoadOutcome {
        let bytes = match self.fetcher.fetch(key.identifier()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Network fetch failed");
                return LoadOutcome::Failure(e);
            }
        };

        if self.persist_raw
            && let Some(image) = self.derive_from_durable_copy(key, &bytes).await
        {
            self.store(key, Arc::clone(&image)).await;
            return LoadOutcome::Hit(image);
        }

        match decode_sized_blocking(bytes, key.width(), key.height()).await {
            Ok(image) => {
                self.store(key, Arc::clone(&image)).await;
                LoadOutcome::Hit(image)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Downloaded image failed to decode");
                LoadOutcome::Failure(e)
            }
        }
    }

    /// Persists the raw download and decodes the sized image from the stored
    /// copy. `None` means the caller should decode the download directly.
    async fn derive_from_durable_copy(&self, key: &CacheKey, bytes: &Bytes) -> Option<SharedImage> {
        if let Err(e) = self.cache.put_raw(key.identifier(), bytes).await {
            warn!(key = %key, error = %e, "Failed to persist raw bytes, decoding download directly");
            return None;
        }

        match self.cache.get_from_disk(key).await {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                debug!(key = %key, "Durable copy unreadable, decoding download directly");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to re-read durable copy");
                None
            }
        }
    }

    /// Best-effort cache write.
    async fn store(&self, key: &CacheKey, image: SharedImage) {
        if let Err(e) = self.cache.put(key.clone(), image).await {
            warn!(key = %key, error = %e, "Failed to cache image");
        }
    }
}

#[cfg(test)]
mod tests {
    use image::DynamicImage;

    use super::*;
    use crate::domain::ports::mock::{MockFetcher, MockImageCache};
    use crate::infrastructure::image::decode::encode_png;

    const URL: &str = "https://example.com/a.png";

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&DynamicImage::new_rgb8(width, height)).unwrap_or_default()
    }

    fn pipeline(cache: Arc<MockImageCache>, fetcher: Arc<MockFetcher>, persist_raw: bool) -> FetchPipeline {
        FetchPipeline::new(cache, fetcher, persist_raw)
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(FetchState::MemoryCheck.on_miss(), FetchState::DiskCheck);
        assert_eq!(FetchState::DiskCheck.on_miss(), FetchState::NetworkFetch);
        assert_eq!(FetchState::NetworkFetch.on_miss(), FetchState::Failed);
        assert!(FetchState::Done.is_terminal());
        assert!(!FetchState::NetworkFetch.is_terminal());
    }

    #[test]
    fn test_memory_check() {
        let key = CacheKey::native(URL);
        let cache = Arc::new(
            MockImageCache::new().with_memory(key.clone(), Arc::new(DynamicImage::new_rgb8(3, 3))),
        );
        let p = pipeline(cache, Arc::new(MockFetcher::new()), true);

        assert!(p.check_memory(&key).is_hit());
        assert!(!p.check_memory(&CacheKey::new(URL, 1, 1)).is_hit());
    }

    #[tokio::test]
    async fn test_resolve_uses_memory_filled_by_another_task() -> Result<(), LoadError> {
        let key = CacheKey::new(URL, 8, 8);
        let cache = Arc::new(MockImageCache::new());
        let fetcher = Arc::new(MockFetcher::new());
        let p = pipeline(Arc::clone(&cache), Arc::clone(&fetcher), true);

        assert!(!p.check_memory(&key).is_hit());
        cache.put(key.clone(), Arc::new(DynamicImage::new_rgb8(8, 8))).await?;

        let loaded = p.resolve(&key).await?;

        assert_eq!(loaded.source, ImageSource::Memory);
        assert_eq!(fetcher.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_disk_hit_skips_network_and_fills_memory() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new().with_raw(URL, png(5, 5)));
        let fetcher = Arc::new(MockFetcher::new());
        let p = pipeline(Arc::clone(&cache), Arc::clone(&fetcher), true);
        let key = CacheKey::native(URL);

        let loaded = p.resolve(&key).await?;

        assert_eq!(loaded.source, ImageSource::Disk);
        assert_eq!(fetcher.calls(), 0);
        assert!(cache.get(&key).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_network_persists_raw_then_decodes_durable_copy() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new());
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, png(6, 4)));
        let p = pipeline(Arc::clone(&cache), Arc::clone(&fetcher), true);
        let key = CacheKey::native(URL);

        let loaded = p.resolve(&key).await?;

        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(loaded.image.width(), 6);
        assert!(cache.has_raw(URL));
        assert_eq!(cache.put_count(), 1);
        assert!(cache.get(&key).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_raw_persist_failure_falls_back_to_direct_decode() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new());
        cache.set_fail_put_raw(true);
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, png(6, 4)));
        let p = pipeline(Arc::clone(&cache), fetcher, true);
        let key = CacheKey::new(URL, 3, 2);

        let loaded = p.resolve(&key).await?;

        assert_eq!((loaded.image.width(), loaded.image.height()), (3, 2));
        assert_eq!(cache.raw_put_count(), 1);
        assert!(!cache.has_raw(URL));
        assert_eq!(cache.put_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_direct_decode_when_persist_disabled() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new());
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, png(2, 2)));
        let p = pipeline(Arc::clone(&cache), fetcher, false);

        p.resolve(&CacheKey::native(URL)).await?;

        assert_eq!(cache.raw_put_count(), 0);
        assert_eq!(cache.put_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_failure_does_not_fail_request() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new());
        cache.set_fail_put(true);
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, png(2, 2)));
        let p = pipeline(cache, fetcher, true);

        let loaded = p.resolve(&CacheKey::native(URL)).await?;
        assert_eq!(loaded.image.width(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_disk_error_degrades_to_network() -> Result<(), LoadError> {
        let cache = Arc::new(MockImageCache::new());
        cache.set_fail_disk(true);
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, png(2, 2)));
        let p = pipeline(cache, Arc::clone(&fetcher), true);

        let loaded = p.resolve(&CacheKey::native(URL)).await?;

        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(fetcher.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_network_failure_is_terminal() {
        let cache = Arc::new(MockImageCache::new());
        let fetcher =
            Arc::new(MockFetcher::new().with_error(URL, LoadError::network("timed out")));
        let p = pipeline(Arc::clone(&cache), Arc::clone(&fetcher), true);
        let key = CacheKey::native(URL);

        let result = p.resolve(&key).await;

        assert_eq!(result.err(), Some(LoadError::network("timed out")));
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn test_corrupt_download_is_decode_failure() {
        let cache = Arc::new(MockImageCache::new());
        let fetcher = Arc::new(MockFetcher::new().with_body(URL, b"<html>oops</html>".to_vec()));
        let p = pipeline(cache, fetcher, true);

        let result = p.resolve(&CacheKey::native(URL)).await;
        assert!(matches!(result, Err(LoadError::DecodeFailure { .. })));
    }
}
