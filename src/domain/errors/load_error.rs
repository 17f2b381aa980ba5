//! Image loading error types.

use thiserror::Error;

/// Image loading error variants.
///
/// Cloneable so a failure cause can travel inside dispatch events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("cache unavailable: {message}")]
    CacheUnavailable { message: String },

    #[error("network failure: {message}")]
    NetworkFailure { message: String },

    #[error("failed to decode image: {message}")]
    DecodeFailure { message: String },

    #[error("invalid load request: {message}")]
    CallerError { message: String },

    #[error("worker pool unavailable: {message}")]
    PoolUnavailable { message: String },
}

impl LoadError {
    /// Creates cache unavailable error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::CacheUnavailable {
            message: message.into(),
        }
    }

    /// Creates network failure error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
        }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Creates caller error.
    #[must_use]
    pub fn caller(message: impl Into<String>) -> Self {
        Self::CallerError {
            message: message.into(),
        }
    }

    /// Creates worker pool error.
    #[must_use]
    pub fn pool(message: impl Into<String>) -> Self {
        Self::PoolUnavailable {
            message: message.into(),
        }
    }

    /// Returns whether the error was caused by invalid input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::CallerError { .. })
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_failure(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. })
    }

    /// Returns whether the error ends a pipeline instead of degrading to the
    /// next tier.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure { .. } | Self::DecodeFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(LoadError::network("timeout").is_terminal());
        assert!(LoadError::decode("bad header").is_terminal());
        assert!(!LoadError::cache("disk full").is_terminal());
        assert!(LoadError::caller("empty batch").is_caller_error());
        assert!(LoadError::network("refused").is_network_failure());
    }

    #[test]
    fn test_display() {
        let err = LoadError::network("HTTP 404 Not Found");
        assert_eq!(err.to_string(), "network failure: HTTP 404 Not Found");
    }
}
