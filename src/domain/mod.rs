//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, ConsumerHandle, DisplayContent, InterestTag};
pub use errors::LoadError;
pub use ports::{DisplayTarget, ImageCachePort, ImageFetchPort};
