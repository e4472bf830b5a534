//! Stable error classification shared by every layer.

use std::fmt;

/// Matchable error kind.
///
/// Each layer keeps its own error enum with the underlying cause attached;
/// `kind()` on those enums maps them onto this shared taxonomy so callers
/// (logging, the monitoring loop, the CLI) can branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing identity fields, rejected before any I/O.
    InvalidInput,
    /// Remote or local lookup miss.
    NotFound,
    /// Credential rejected by the remote API.
    Unauthorized,
    /// Rate limit still exhausted after the single permitted wait.
    RateLimited,
    /// Network or decode fault.
    Transport,
    /// A batch write was rolled back.
    TransactionFailed,
    /// The entity exists but owns no commits yet.
    NoRecordsYet,
    /// Work was aborted by the shutdown signal.
    Cancelled,
    /// Any other storage error.
    Database,
    /// A worker panicked or was aborted.
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::TransactionFailed => "transaction_failed",
            Self::NoRecordsYet => "no_records_yet",
            Self::Cancelled => "cancelled",
            Self::Database => "database",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
