use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur when interacting with a code host.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Non-success response that maps to no narrower variant.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Quota still exhausted after the single permitted wait.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Credential rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Resource not found (repository, commit list).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response body could not be decoded.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Aborted by the shutdown signal.
    #[error("Request cancelled")]
    Cancelled,

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Api { .. } | Self::Network { .. } | Self::Decode { .. } | Self::Internal { .. } => {
                ErrorKind::Transport
            }
        }
    }
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
