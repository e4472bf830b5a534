//! Conversion from GitHub wire types to platform snapshots.

use crate::platform::{CommitSnapshot, RepoSnapshot};

use super::error::GitHubError;
use super::types::{GitHubCommit, GitHubRepo};

/// Convert a repository response, keyed by the identity it was requested under.
///
/// GitHub follows renames and transfers with redirects, so the returned
/// `owner.login`/`name` can differ from the request; the requested key stays
/// the stored identity.
pub fn to_repo_snapshot(repo: GitHubRepo, owner: &str, name: &str) -> RepoSnapshot {
    if !repo.owner.login.eq_ignore_ascii_case(owner) || !repo.name.eq_ignore_ascii_case(name) {
        tracing::debug!(
            requested = %format!("{owner}/{name}"),
            reported = %format!("{}/{}", repo.owner.login, repo.name),
            "GitHub reported a different repository identity"
        );
    }

    RepoSnapshot {
        owner: owner.to_string(),
        name: name.to_string(),
        description: repo.description.filter(|d| !d.is_empty()),
        url: repo.html_url,
        language: repo.language,
        forks: repo.forks_count,
        stars: repo.stargazers_count,
        open_issues: repo.open_issues_count,
        watchers: repo.watchers_count,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
    }
}

/// Convert one commit list element.
///
/// The authored date is preferred; the committer date covers commits whose
/// author block is missing.
pub fn to_commit_snapshot(commit: GitHubCommit) -> Result<CommitSnapshot, GitHubError> {
    let GitHubCommit {
        sha,
        commit: detail,
        html_url,
    } = commit;

    let author_date = detail.author.as_ref().and_then(|a| a.date);
    let committer_date = detail.committer.as_ref().and_then(|c| c.date);
    let date = author_date
        .or(committer_date)
        .ok_or_else(|| GitHubError::MissingCommitDate { sha: sha.clone() })?;

    let author_name = detail
        .author
        .and_then(|a| a.name.or(a.email))
        .unwrap_or_default();

    Ok(CommitSnapshot {
        sha,
        message: detail.message,
        author_name,
        date,
        url: html_url,
    })
}
