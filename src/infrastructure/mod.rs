//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image handling (caching, fetching, loading).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigStore, LoaderConfig, LogLevel};
pub use image::{
    CacheStats, DiskImageCache, DispatchOutcome, HttpImageFetcher, ImageLoader, LoadStatus,
    MemoryImageCache, ResultDispatcher, TieredImageCache, WorkerPool,
};
