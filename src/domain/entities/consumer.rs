//! Consumer handles and their interest tags.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::SharedImage;
use crate::domain::ports::DisplayTarget;

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// What a consumer currently wants to display.
///
/// Replaced by every load call; compared by the dispatcher before a result is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterestTag {
    /// A single identifier.
    Single(String),
    /// The ordered identifier set of a batch.
    Batch(Arc<[String]>),
}

impl InterestTag {
    /// Creates the tag for a single identifier.
    #[must_use]
    pub fn single(identifier: impl Into<String>) -> Self {
        Self::Single(identifier.into())
    }

    /// Creates the composite tag for a batch.
    #[must_use]
    pub fn batch(identifiers: &[String]) -> Self {
        Self::Batch(identifiers.into())
    }

    /// Returns true if this tag asks for exactly `identifier`.
    #[must_use]
    pub fn is_single(&self, identifier: &str) -> bool {
        matches!(self, Self::Single(id) if id == identifier)
    }

    /// Returns true if this tag asks for exactly this batch, in this order.
    #[must_use]
    pub fn is_batch(&self, identifiers: &[String]) -> bool {
        matches!(self, Self::Batch(ids) if ids.as_ref() == identifiers)
    }
}

impl std::fmt::Display for InterestTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(id) => write!(f, "{id}"),
            Self::Batch(ids) => write!(f, "[{}]", ids.join(", ")),
        }
    }
}

/// Images handed to a display target.
#[derive(Debug, Clone)]
pub enum DisplayContent {
    /// One image.
    Single(SharedImage),
    /// A batch of images in request order.
    Multiple(Vec<SharedImage>),
}

impl DisplayContent {
    /// Returns the number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(images) => images.len(),
        }
    }

    /// Returns true if there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ConsumerInner {
    id: u64,
    target: Arc<dyn DisplayTarget>,
    interest: Mutex<Option<InterestTag>>,
    error_placeholder: Mutex<Option<SharedImage>>,
}

/// Handle to an external display target plus its current interest.
///
/// Clones share the same target and the same interest tag.
#[derive(Clone)]
pub struct ConsumerHandle {
    inner: Arc<ConsumerInner>,
}

impl ConsumerHandle {
    /// Wraps a display target.
    #[must_use]
    pub fn new(target: Arc<dyn DisplayTarget>) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                id: NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed),
                target,
                interest: Mutex::new(None),
                error_placeholder: Mutex::new(None),
            }),
        }
    }

    /// Sets the image shown when a single load fails.
    #[must_use]
    pub fn with_error_placeholder(self, placeholder: SharedImage) -> Self {
        self.set_error_placeholder(Some(placeholder));
        self
    }

    /// Process-unique id, for logging.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the current interest tag.
    #[must_use]
    pub fn current_interest(&self) -> Option<InterestTag> {
        self.inner.interest.lock().clone()
    }

    /// Replaces the current interest tag.
    pub fn set_interest(&self, tag: InterestTag) {
        *self.inner.interest.lock() = Some(tag);
    }

    /// Returns true if the consumer currently wants exactly `identifier`.
    #[must_use]
    pub fn wants_single(&self, identifier: &str) -> bool {
        self.inner
            .interest
            .lock()
            .as_ref()
            .is_some_and(|tag| tag.is_single(identifier))
    }

    /// Returns true if the consumer currently wants exactly this batch.
    #[must_use]
    pub fn wants_batch(&self, identifiers: &[String]) -> bool {
        self.inner
            .interest
            .lock()
            .as_ref()
            .is_some_and(|tag| tag.is_batch(identifiers))
    }

    /// Returns the configured error placeholder.
    #[must_use]
    pub fn error_placeholder(&self) -> Option<SharedImage> {
        self.inner.error_placeholder.lock().clone()
    }

    /// Replaces the error placeholder.
    pub fn set_error_placeholder(&self, placeholder: Option<SharedImage>) {
        *self.inner.error_placeholder.lock() = placeholder;
    }

    /// Hands content to the display target.
    pub fn apply(&self, content: DisplayContent) {
        self.inner.target.show(content);
    }
}

impl std::fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("id", &self.inner.id)
            .field("interest", &self.current_interest())
            .finish_non_exhaustive()
    }
}
