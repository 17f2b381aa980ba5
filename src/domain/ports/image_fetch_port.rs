//! Port definition for fetching image bytes from the network.

use bytes::Bytes;

use crate::domain::errors::LoadError;

/// Port for downloading undecoded image bytes.
#[async_trait::async_trait]
pub trait ImageFetchPort: Send + Sync {
    /// Downloads the full body behind `url`.
    ///
    /// Every transport problem (refused connection, timeout, non-success
    /// status, truncated body) is reported as `LoadError::NetworkFailure`.
    async fn fetch(&self, url: &str) -> Result<Bytes, LoadError>;
}
