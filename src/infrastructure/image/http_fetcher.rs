//! HTTP adapter for the image fetch port.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::{debug, trace};

use crate::domain::errors::LoadError;
use crate::domain::ports::ImageFetchPort;
use crate::infrastructure::config::NetworkConfig;

/// Downloads image bodies over HTTP(S), streaming into a bounded buffer.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    buffer_size: usize,
    max_body_bytes: usize,
}

impl HttpImageFetcher {
    /// Creates a fetcher from network settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &NetworkConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LoadError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            buffer_size: config.buffer_size,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait::async_trait]
impl ImageFetchPort for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, LoadError> {
        debug!(url, "Downloading image from network");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LoadError::network(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let expected = response.content_length();
        if let Some(len) = expected
            && len > self.max_body_bytes as u64
        {
            return Err(LoadError::network(format!(
                "Body of {len} bytes exceeds limit of {} bytes",
                self.max_body_bytes
            )));
        }

        let mut body = BytesMut::with_capacity(self.buffer_size);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LoadError::network(format!("Failed to read body: {e}")))?;
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(LoadError::network(format!(
                    "Body exceeds limit of {} bytes",
                    self.max_body_bytes
                )));
            }
            trace!(url, chunk = chunk.len(), "Received body chunk");
            body.extend_from_slice(&chunk);
        }

        if let Some(len) = expected
            && (body.len() as u64) < len
        {
            return Err(LoadError::network(format!(
                "Body truncated: received {} of {len} bytes",
                body.len()
            )));
        }

        Ok(body.freeze())
    }
}
