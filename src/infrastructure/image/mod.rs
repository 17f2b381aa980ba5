//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction
//! - Disk caching for persistence
//! - Sized decoding on the blocking pool
//! - HTTP fetching with a bounded body buffer
//! - The loader that ties the tiers together

pub mod decode;
pub mod disk_cache;
pub mod http_fetcher;
pub mod loader;
pub mod memory_cache;
pub mod tiered_cache;

pub use disk_cache::DiskImageCache;
pub use http_fetcher::HttpImageFetcher;
pub use loader::{
    DispatchEvent, DispatchOutcome, ImageLoader, LoadStatus, ResultDispatcher, WorkerPool, global,
    install,
};
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use tiered_cache::TieredImageCache;
