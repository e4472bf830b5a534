//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success status with no narrower meaning.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// 401, or 403 without an exhausted quota.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Quota still exhausted after waiting once.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// A commit arrived without any usable timestamp.
    #[error("Commit {sha} has no author or committer date")]
    MissingCommitDate { sha: String },

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GitHubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Http(_)
            | Self::Json(_)
            | Self::Api { .. }
            | Self::MissingCommitDate { .. }
            | Self::Url(_)
            | Self::Config(_) => ErrorKind::Transport,
        }
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => PlatformError::Network { message },
            GitHubError::Json(e) => PlatformError::Decode {
                message: e.to_string(),
            },
            GitHubError::MissingCommitDate { sha } => PlatformError::Decode {
                message: format!("commit {sha} has no date"),
            },
            GitHubError::Api { status, message } => PlatformError::Api { status, message },
            GitHubError::NotFound(resource) => PlatformError::NotFound { resource },
            GitHubError::Unauthorized(message) => PlatformError::Unauthorized { message },
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::Url(e) => PlatformError::internal(format!("invalid request URL: {e}")),
            GitHubError::Cancelled => PlatformError::Cancelled,
            GitHubError::Config(message) => PlatformError::internal(message),
        }
    }
}
