//! Domain entity definitions.

mod batch;
mod cache_key;
mod consumer;
mod image;
mod request;

pub use batch::{BatchRequest, ResultSet};
pub use cache_key::CacheKey;
pub use consumer::{ConsumerHandle, DisplayContent, InterestTag};
pub use image::{ImageId, ImageSource, LoadOutcome, LoadedImage, SharedImage};
pub use request::LoadRequest;
