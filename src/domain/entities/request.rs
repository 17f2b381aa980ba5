//! Single-image load requests.

use super::{CacheKey, ConsumerHandle, InterestTag};

/// One identifier at one size, for one consumer.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    key: CacheKey,
    consumer: ConsumerHandle,
}

impl LoadRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(key: CacheKey, consumer: ConsumerHandle) -> Self {
        Self { key, consumer }
    }

    /// The sized key to resolve.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Interest tag that marks this request as wanted.
    #[must_use]
    pub fn tag(&self) -> InterestTag {
        InterestTag::single(self.key.identifier())
    }

    /// Splits the request into its parts.
    #[must_use]
    pub fn into_parts(self) -> (CacheKey, ConsumerHandle) {
        (self.key, self.consumer)
    }
}
