mod display_port;
mod image_cache_port;
mod image_fetch_port;

pub use display_port::DisplayTarget;
pub use image_cache_port::{CacheResult, ImageCachePort};
pub use image_fetch_port::ImageFetchPort;

#[cfg(test)]
pub mod mock {
    pub use super::display_port::mock::RecordingTarget;
    pub use super::image_cache_port::mock::MockImageCache;
    pub use super::image_fetch_port::mock::MockFetcher;
}
