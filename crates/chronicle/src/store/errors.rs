use sea_orm::DbErr;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::platform::RepoKey;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Rejected before any I/O.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Repository not tracked.
    #[error("Repository not found: {context}")]
    EntityNotFound { context: String },

    /// Repository tracked but owns no commits. A valid state, not a fault.
    #[error("Repository {repo} has no commits yet")]
    NoRecordsYet { repo: String },

    /// A batch write was rolled back; nothing from the batch was committed.
    #[error("Transaction rolled back ({failed} of {total} chunks failed): {source}")]
    TransactionFailed {
        failed: usize,
        total: usize,
        #[source]
        source: Box<StoreError>,
    },

    /// Aborted by the shutdown signal; any open transaction was rolled back.
    #[error("Write cancelled")]
    Cancelled,

    /// Worker panic or similar invariant break.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found_by_key(key: &RepoKey) -> Self {
        Self::EntityNotFound {
            context: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::EntityNotFound { .. } => ErrorKind::NotFound,
            Self::NoRecordsYet { .. } => ErrorKind::NoRecordsYet,
            Self::TransactionFailed { .. } => ErrorKind::TransactionFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Database(_) => ErrorKind::Database,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
