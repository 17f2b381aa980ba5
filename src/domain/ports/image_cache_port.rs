//! Port definition for image caching.

use crate::domain::entities::{CacheKey, SharedImage};
use crate::domain::errors::LoadError;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, LoadError>;

/// Port for the two-tier image cache.
/// Implementations must be thread-safe; lost writes under races are tolerated.
#[async_trait::async_trait]
pub trait ImageCachePort: Send + Sync {
    /// Looks up the memory tier. Must not block on I/O.
    fn get(&self, key: &CacheKey) -> Option<SharedImage>;

    /// Looks up the durable tier, decoding at the key's requested size.
    ///
    /// Implementations that answer both tiers from `get` keep this default,
    /// which always reports a miss.
    async fn get_from_disk(&self, _key: &CacheKey) -> CacheResult<Option<SharedImage>> {
        Ok(None)
    }

    /// Stores a decoded image. Best-effort.
    async fn put(&self, key: CacheKey, image: SharedImage) -> CacheResult<()>;

    /// Writes undecoded bytes to durable storage so the native resolution
    /// survives any decode-time downscaling.
    async fn put_raw(&self, identifier: &str, bytes: &[u8]) -> CacheResult<()>;

    /// Drops every cached entry.
    async fn clear(&self) -> CacheResult<()>;
}
