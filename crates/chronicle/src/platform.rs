//! Remote-client port.
//!
//! [`PlatformClient`] is the capability the orchestrator needs from a code
//! host. The GitHub client implements it; tests substitute in-memory fakes.
//!
//! # Example
//!
//! ```ignore
//! use chronicle::platform::{PlatformClient, RepoKey};
//!
//! async fn show<C: PlatformClient>(client: &C, key: &RepoKey) -> chronicle::platform::Result<()> {
//!     let commits = client.fetch_commits_since(&key.owner, &key.name, None).await?;
//!     println!("{key}: {} commits", commits.len());
//!     Ok(())
//! }
//! ```

mod errors;
mod types;

pub use errors::{PlatformError, Result};
pub use types::{CommitSnapshot, PlatformClient, RepoKey, RepoKeyError, RepoSnapshot};
