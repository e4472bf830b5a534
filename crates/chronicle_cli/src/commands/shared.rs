use std::sync::Arc;

use chronicle::github::GitHubClient;
use chronicle::platform::{RepoKey, RepoKeyError};
use chronicle::shutdown::ShutdownSignal;
use chronicle::store::{self, SeaOrmStore, StoreError};
use chronicle::sync::{SyncOutcome, Syncer};
use console::style;
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::config::SyncSettings;

pub(crate) type GitHubSyncer = Syncer<GitHubClient, SeaOrmStore>;

/// Wire the GitHub client and the database store into a syncer.
pub(crate) fn build_syncer(
    settings: &SyncSettings,
    db: DatabaseConnection,
    shutdown: ShutdownSignal,
) -> Result<GitHubSyncer, Box<dyn std::error::Error>> {
    let client = GitHubClient::new(&settings.github, shutdown.clone())?;
    let store = SeaOrmStore::new(db, settings.writer, shutdown.clone());
    Ok(Syncer::new(Arc::new(client), Arc::new(store), shutdown))
}

/// Failure to turn `--repo` into a tracked repository.
#[derive(Debug, Error)]
pub(crate) enum RepoLookupError {
    #[error(transparent)]
    Key(#[from] RepoKeyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no tracked repository is named '{0}'; use owner/name")]
    NotTracked(String),

    #[error("repository name '{name}' is ambiguous, matches: {}", .matches.join(", "))]
    Ambiguous { name: String, matches: Vec<String> },
}

/// `--repo` as given, or `fallback` when omitted.
///
/// `owner/name` is used verbatim. A bare name is looked up among tracked
/// repositories and must match exactly one of them.
pub(crate) async fn resolve_repo(
    arg: Option<&str>,
    db: &DatabaseConnection,
    fallback: &RepoKey,
) -> Result<RepoKey, RepoLookupError> {
    let Some(input) = arg else {
        return Ok(fallback.clone());
    };

    match input.parse::<RepoKey>() {
        Ok(key) => Ok(key),
        Err(RepoKeyError::MissingOwner(name)) => find_tracked(db, &name).await,
        Err(e) => Err(e.into()),
    }
}

async fn find_tracked(db: &DatabaseConnection, name: &str) -> Result<RepoKey, RepoLookupError> {
    let mut matches = store::find_by_name(db, name).await?;
    match matches.len() {
        0 => Err(RepoLookupError::NotTracked(name.to_string())),
        1 => Ok(matches.remove(0).key()),
        _ => Err(RepoLookupError::Ambiguous {
            name: name.to_string(),
            matches: matches.iter().map(|repo| repo.key().to_string()).collect(),
        }),
    }
}

pub(crate) fn print_outcome(key: &RepoKey, outcome: &SyncOutcome) {
    if outcome.is_noop() {
        println!(
            "{} {} is up to date ({} fetched)",
            style("✓").green(),
            style(key).bold(),
            outcome.fetched
        );
    } else {
        println!(
            "{} {}: {} commits fetched, {} written",
            style("✓").green(),
            style(key).bold(),
            outcome.fetched,
            outcome.written
        );
    }
}
