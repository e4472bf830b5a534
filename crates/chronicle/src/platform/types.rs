use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::errors::Result;

/// Natural key of a tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoKey {
    pub owner: String,
    pub name: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoKeyError {
    #[error("repository reference is empty")]
    Empty,
    #[error("repository '{0}' has no owner; use owner/name")]
    MissingOwner(String),
    #[error("invalid repository reference '{0}'")]
    Malformed(String),
}

impl FromStr for RepoKey {
    type Err = RepoKeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RepoKeyError::Empty);
        }
        match s.split_once('/') {
            None => Err(RepoKeyError::MissingOwner(s.to_string())),
            Some((owner, name))
                if owner.is_empty() || name.is_empty() || name.contains('/') =>
            {
                Err(RepoKeyError::Malformed(s.to_string()))
            }
            Some((owner, name)) => Ok(Self::new(owner, name)),
        }
    }
}

/// Repository metadata as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    /// Canonical HTML URL.
    pub url: String,
    pub language: Option<String>,
    pub forks: i32,
    pub stars: i32,
    pub open_issues: i32,
    pub watchers: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RepoSnapshot {
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.name)
    }
}

/// One commit as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSnapshot {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    /// Authored timestamp.
    pub date: DateTime<Utc>,
    pub url: String,
}

/// Read-only access to a code host.
///
/// Implementations perform no retries of their own except the single
/// rate-limit wait described on [`PlatformClient::fetch_commits_since`].
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetch one repository's metadata with a single request.
    ///
    /// Fails with `NotFound` on a remote 404, `Unauthorized` on 401/403 that
    /// is not a rate-limit response, and `Network`/`Decode` on transport faults.
    async fn fetch_repository(&self, owner: &str, name: &str) -> Result<RepoSnapshot>;

    /// Fetch every commit the remote reports for `since` onwards, across all pages.
    ///
    /// `None` means all history. When a page request hits an exhausted rate
    /// limit, the client waits until the advertised reset and retries that
    /// page once; a second consecutive rate-limit response is an error.
    async fn fetch_commits_since(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CommitSnapshot>>;
}
