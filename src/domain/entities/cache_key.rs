//! Cache key for sized image lookups.

/// Identifies one decoded image in the cache.
///
/// A width or height of `0` means the image is wanted at its native size,
/// which is a distinct entry from any explicit size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    identifier: String,
    width: u32,
    height: u32,
}

impl CacheKey {
    /// Creates a key for the given identifier and requested size.
    #[must_use]
    pub fn new(identifier: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            identifier: identifier.into(),
            width,
            height,
        }
    }

    /// Creates a key that asks for the native image size.
    #[must_use]
    pub fn native(identifier: impl Into<String>) -> Self {
        Self::new(identifier, 0, 0)
    }

    /// Returns the identifier (usually a URL).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the requested width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the requested height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns true if the image should be decoded at its native size.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}x{}", self.identifier, self.width, self.height)
    }
}
