//! GitHub REST v3 client.
//!
//! # Module Structure
//!
//! - [`client`] - Authenticated requests, rate-limit wait, [`PlatformClient`](crate::platform::PlatformClient) impl
//! - [`pagination`] - `Link` header parsing and the lazy commit pager
//! - [`types`] - Wire shapes
//! - [`convert`] - Wire shapes to platform snapshots
//! - [`error`] - Error types

mod client;
mod convert;
mod error;
mod pagination;
mod types;

pub use client::{GITHUB_API_URL, GitHubClient, GitHubSettings, PAGE_SIZE};
pub use convert::{to_commit_snapshot, to_repo_snapshot};
pub use error::GitHubError;
pub use pagination::{CommitPages, LinkPagination, parse_link_header};
pub use types::{GitHubCommit, GitHubCommitDetail, GitHubOwner, GitHubRepo, GitHubSignature};
