//! Domain types for loaded images.

use std::sync::Arc;

use super::CacheKey;
use crate::domain::errors::LoadError;

/// Shared decoded image.
pub type SharedImage = Arc<image::DynamicImage>;

/// Filesystem-safe identifier for a durable cache entry.
/// Generated from a hash of the image identifier (usually a URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an `ImageId` from an identifier by hashing it.
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Loaded from in-memory LRU cache.
    Memory,
    /// Loaded from disk cache.
    Disk,
    /// Downloaded from network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A decoded image together with the key and tier that produced it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// The key the image was resolved for.
    pub key: CacheKey,
    /// The decoded image.
    pub image: SharedImage,
    /// The tier that produced the image.
    pub source: ImageSource,
}

/// Result of querying a single tier for a single identifier.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The tier produced the image.
    Hit(SharedImage),
    /// The tier does not hold the image; try the next one.
    Miss,
    /// The tier failed terminally.
    Failure(LoadError),
}

impl LoadOutcome {
    /// Returns true if the tier produced an image.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_id_from_identifier() {
        let id = ImageId::from_identifier("https://example.com/attachments/123/image.png");
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_image_id_consistency() {
        let url = "https://example.com/image.png";
        assert_eq!(ImageId::from_identifier(url), ImageId::from_identifier(url));
        assert_ne!(
            ImageId::from_identifier(url),
            ImageId::from_identifier("https://example.com/other.png")
        );
    }

    #[test]
    fn test_image_source_display() {
        assert_eq!(ImageSource::Memory.to_string(), "memory");
        assert_eq!(ImageSource::Disk.to_string(), "disk");
        assert_eq!(ImageSource::Network.to_string(), "network");
    }
}
