//! Error types for rate limiting.

use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The client's bucket is empty.
    #[error("Rate limit exceeded for client {client}")]
    Exceeded {
        /// The client key that was rejected.
        client: String,
        /// Time until the bucket holds a token again. Saturates when the bucket never refills.
        retry_after: Duration,
    },

    /// The configured quota cannot be turned into a token bucket.
    #[error("Invalid rate limit configuration: {0}")]
    InvalidQuota(String),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Exceeded { retry_after, .. } => Some(*retry_after),
            Self::InvalidQuota(_) => None,
        }
    }
}
