//! Port for the external display target behind a consumer handle.

use crate::domain::entities::DisplayContent;

/// Receives decoded images. Rendering is entirely the target's business.
pub trait DisplayTarget: Send + Sync {
    /// Shows one image or an ordered set of images.
    fn show(&self, content: DisplayContent);
}
