//! Multi-image batch requests.

use std::collections::HashMap;

use super::{CacheKey, ConsumerHandle, InterestTag, SharedImage};

/// Images resolved so far for a batch, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    images: HashMap<String, SharedImage>,
}

impl ResultSet {
    /// Inserts an image. The first image stored for an identifier wins;
    /// returns false if the identifier was already present.
    pub fn insert(&mut self, identifier: &str, image: SharedImage) -> bool {
        if self.images.contains_key(identifier) {
            return false;
        }
        self.images.insert(identifier.to_string(), image);
        true
    }

    /// Returns the image stored for `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&SharedImage> {
        self.images.get(identifier)
    }

    /// Returns true if `identifier` has been resolved.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.images.contains_key(identifier)
    }

    /// Number of resolved identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if nothing has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A group of identifiers that must all resolve before any is shown.
#[derive(Debug)]
pub struct BatchRequest {
    identifiers: Vec<String>,
    consumer: ConsumerHandle,
    width: u32,
    height: u32,
    results: ResultSet,
}

impl BatchRequest {
    /// Creates an empty batch for the given identifiers and shared size.
    #[must_use]
    pub fn new(identifiers: Vec<String>, consumer: ConsumerHandle, width: u32, height: u32) -> Self {
        Self {
            identifiers,
            consumer,
            width,
            height,
            results: ResultSet::default(),
        }
    }

    /// Identifiers in request order.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// The consumer that issued the batch.
    #[must_use]
    pub const fn consumer(&self) -> &ConsumerHandle {
        &self.consumer
    }

    /// Requested width shared by every image.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Requested height shared by every image.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cache key for one member of the batch.
    #[must_use]
    pub fn key_for(&self, identifier: &str) -> CacheKey {
        CacheKey::new(identifier, self.width, self.height)
    }

    /// Composite interest tag for the whole batch.
    #[must_use]
    pub fn tag(&self) -> InterestTag {
        InterestTag::batch(&self.identifiers)
    }

    /// Images resolved so far.
    #[must_use]
    pub const fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Records a resolved image.
    pub fn insert(&mut self, identifier: &str, image: SharedImage) -> bool {
        self.results.insert(identifier, image)
    }

    /// Returns true once every identifier has an image.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.identifiers.iter().all(|id| self.results.contains(id))
    }

    /// Unresolved identifiers, in request order, without duplicates.
    #[must_use]
    pub fn remaining(&self) -> Vec<String> {
        let mut remaining: Vec<String> = Vec::new();
        for id in &self.identifiers {
            if !self.results.contains(id) && !remaining.contains(id) {
                remaining.push(id.clone());
            }
        }
        remaining
    }

    /// Images in request order, or `None` while the batch is incomplete.
    #[must_use]
    pub fn ordered_images(&self) -> Option<Vec<SharedImage>> {
        self.identifiers
            .iter()
            .map(|id| self.results.get(id).cloned())
            .collect()
    }
}
