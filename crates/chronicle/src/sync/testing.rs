//! In-memory collaborators for orchestrator and monitor tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::repository::Model as RepositoryModel;
use crate::platform::{
    CommitSnapshot, PlatformClient, PlatformError, RepoKey, RepoSnapshot, Result as PlatformResult,
};
use crate::store::{NewCommit, Result as StoreResult, StoreError, SyncStore, validate_key};

pub(crate) fn snapshot(owner: &str, name: &str) -> RepoSnapshot {
    RepoSnapshot {
        owner: owner.to_string(),
        name: name.to_string(),
        description: Some(format!("{name} repository")),
        url: format!("https://github.com/{owner}/{name}"),
        language: Some("Rust".to_string()),
        forks: 1,
        stars: 10,
        open_issues: 2,
        watchers: 10,
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn commit(sha: &str, date: DateTime<Utc>) -> CommitSnapshot {
    CommitSnapshot {
        sha: sha.to_string(),
        message: format!("commit {sha}"),
        author_name: "Ada".to_string(),
        date,
        url: format!("https://github.com/acme/widget/commit/{sha}"),
    }
}

/// Serves canned repositories and commits; `since` filters inclusively.
#[derive(Default)]
pub(crate) struct FakeClient {
    repos: Mutex<HashMap<String, RepoSnapshot>>,
    commits: Mutex<HashMap<String, Vec<CommitSnapshot>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl FakeClient {
    pub(crate) fn with_repo(self, owner: &str, name: &str, commits: Vec<CommitSnapshot>) -> Self {
        let key = format!("{owner}/{name}");
        self.repos
            .lock()
            .unwrap()
            .insert(key.clone(), snapshot(owner, name));
        self.commits.lock().unwrap().insert(key, commits);
        self
    }

    pub(crate) fn failing(self, owner: &str, name: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(format!("{owner}/{name}"));
        self
    }

    /// `(repo, since)` of every commit fetch, in call order.
    pub(crate) fn commit_calls(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn fetch_repository(&self, owner: &str, name: &str) -> PlatformResult<RepoSnapshot> {
        let key = format!("{owner}/{name}");
        if self.failing.lock().unwrap().contains(&key) {
            return Err(PlatformError::network("connection reset"));
        }
        self.repos
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(key))
    }

    async fn fetch_commits_since(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> PlatformResult<Vec<CommitSnapshot>> {
        let key = format!("{owner}/{name}");
        self.calls.lock().unwrap().push((key.clone(), since));
        let commits = self
            .commits
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        Ok(commits
            .into_iter()
            .filter(|c| since.is_none_or(|s| c.date >= s))
            .collect())
    }
}

/// Map-backed store honoring the upsert and cursor contracts.
#[derive(Default)]
pub(crate) struct MemoryStore {
    repos: Mutex<Vec<RepositoryModel>>,
    commits: Mutex<HashMap<String, (i32, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub(crate) fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn upsert_repository(&self, snapshot: &RepoSnapshot) -> StoreResult<()> {
        validate_key(&snapshot.owner, &snapshot.name)?;
        let mut repos = self.repos.lock().unwrap();
        let now = Utc::now().fixed_offset();
        if let Some(row) = repos
            .iter_mut()
            .find(|r| r.owner == snapshot.owner && r.name == snapshot.name)
        {
            row.stars_count = snapshot.stars;
            row.synced_at = now;
            return Ok(());
        }
        let id = repos.len() as i32 + 1;
        repos.push(RepositoryModel {
            id,
            owner: snapshot.owner.clone(),
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            url: snapshot.url.clone(),
            language: snapshot.language.clone(),
            forks_count: snapshot.forks,
            stars_count: snapshot.stars,
            open_issues_count: snapshot.open_issues,
            watchers_count: snapshot.watchers,
            created_at: None,
            updated_at: None,
            synced_at: now,
        });
        Ok(())
    }

    async fn find_repository(&self, key: &RepoKey) -> StoreResult<Option<RepositoryModel>> {
        Ok(self
            .repos
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.owner == key.owner && r.name == key.name)
            .cloned())
    }

    async fn list_repositories(&self) -> StoreResult<Vec<RepositoryModel>> {
        Ok(self.repos.lock().unwrap().clone())
    }

    async fn latest_commit_date(&self, key: &RepoKey) -> StoreResult<DateTime<Utc>> {
        let repo = self
            .find_repository(key)
            .await?
            .ok_or_else(|| StoreError::not_found_by_key(key))?;
        self.commits
            .lock()
            .unwrap()
            .values()
            .filter(|(id, _)| *id == repo.id)
            .map(|(_, date)| *date)
            .max()
            .ok_or_else(|| StoreError::NoRecordsYet {
                repo: key.to_string(),
            })
    }

    async fn upsert_commits(&self, commits: Vec<NewCommit>) -> StoreResult<u64> {
        let mut stored = self.commits.lock().unwrap();
        let mut written = 0;
        for commit in commits {
            match stored.get(&commit.sha) {
                Some((_, date)) if *date >= commit.date => {}
                _ => {
                    stored.insert(commit.sha, (commit.repository_id, commit.date));
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}
