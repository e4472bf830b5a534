use thiserror::Error;

use crate::error::ErrorKind;
use crate::platform::PlatformError;
use crate::store::StoreError;

/// A failed sync pass, tagged with the step that failed and the repository.
///
/// No new kinds are introduced here; [`SyncError::kind`] reports the cause's.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch repository {repo}: {source}")]
    FetchRepository {
        repo: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to store repository {repo}: {source}")]
    StoreRepository {
        repo: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to load stored repository {repo}: {source}")]
    LoadRepository {
        repo: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to fetch commits for {repo}: {source}")]
    FetchCommits {
        repo: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to store commits for {repo}: {source}")]
    StoreCommits {
        repo: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read sync cursor for {repo}: {source}")]
    Cursor {
        repo: String,
        #[source]
        source: StoreError,
    },

    #[error("sync of {repo} cancelled")]
    Cancelled { repo: String },

    /// The task running this sync panicked or was aborted.
    #[error("sync worker for {repo} failed: {message}")]
    Worker { repo: String, message: String },
}

impl SyncError {
    pub fn repo(&self) -> &str {
        match self {
            Self::FetchRepository { repo, .. }
            | Self::StoreRepository { repo, .. }
            | Self::LoadRepository { repo, .. }
            | Self::FetchCommits { repo, .. }
            | Self::StoreCommits { repo, .. }
            | Self::Cursor { repo, .. }
            | Self::Cancelled { repo }
            | Self::Worker { repo, .. } => repo,
        }
    }

    /// Name of the failed step, for log fields.
    pub fn step(&self) -> &'static str {
        match self {
            Self::FetchRepository { .. } => "fetch_repository",
            Self::StoreRepository { .. } => "store_repository",
            Self::LoadRepository { .. } => "load_repository",
            Self::FetchCommits { .. } => "fetch_commits",
            Self::StoreCommits { .. } => "store_commits",
            Self::Cursor { .. } => "cursor",
            Self::Cancelled { .. } => "cancelled",
            Self::Worker { .. } => "worker",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FetchRepository { source, .. } | Self::FetchCommits { source, .. } => {
                source.kind()
            }
            Self::StoreRepository { source, .. }
            | Self::LoadRepository { source, .. }
            | Self::StoreCommits { source, .. }
            | Self::Cursor { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Worker { .. } => ErrorKind::Internal,
        }
    }
}
