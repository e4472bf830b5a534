//! GitHub REST client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::convert::to_repo_snapshot;
use super::error::GitHubError;
use super::pagination::CommitPages;
use super::types::GitHubRepo;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{self, CommitSnapshot, PlatformClient, RepoSnapshot};
use crate::shutdown::ShutdownSignal;

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Maximum page size accepted by the commits endpoint.
pub const PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// API root, without trailing slash. Override for GitHub Enterprise.
    pub api_url: String,
    pub token: String,
}

impl GitHubSettings {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: token.into(),
        }
    }
}

/// GitHub API client.
///
/// Stateless between calls apart from the pooled HTTP connection inside the
/// transport.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    token: String,
    shutdown: ShutdownSignal,
}

impl GitHubClient {
    /// Create a client backed by reqwest with a 30 second request timeout.
    pub fn new(settings: &GitHubSettings, shutdown: ShutdownSignal) -> Result<Self, GitHubError> {
        if settings.token.trim().is_empty() {
            return Err(GitHubError::Config("GitHub token is empty".to_string()));
        }
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)
            .map_err(|e| GitHubError::Config(e.to_string()))?;

        Ok(Self::new_with_transport(
            settings,
            Arc::new(transport),
            shutdown,
        ))
    }

    pub fn new_with_transport(
        settings: &GitHubSettings,
        transport: Arc<dyn HttpTransport>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            transport,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            shutdown,
        }
    }

    /// Lazily page through commits; see [`CommitPages`].
    pub fn commit_pages<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
        since: Option<DateTime<Utc>>,
    ) -> CommitPages<'a> {
        CommitPages::new(self, owner, name, since)
    }

    pub(super) fn commits_url(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
        per_page: u32,
    ) -> Result<String, GitHubError> {
        let mut url = url::Url::parse(&format!(
            "{}/repos/{}/{}/commits",
            self.api_url, owner, name
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &per_page.to_string());
            if let Some(since) = since {
                query.append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        }
        Ok(url.to_string())
    }

    fn headers(&self) -> HttpHeaders {
        vec![
            (
                "Accept".to_string(),
                "application/vnd.github.v3+json".to_string(),
            ),
            ("User-Agent".to_string(), "chronicle".to_string()),
            ("Authorization".to_string(), format!("token {}", self.token)),
        ]
    }

    /// Authenticated GET that decodes a JSON body and returns the response headers.
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
    ) -> Result<(T, HttpHeaders), GitHubError> {
        let response = self.send(url).await?;
        check_status(&response, resource)?;
        let value = serde_json::from_slice(&response.body)?;
        Ok((value, response.headers))
    }

    /// Send a GET, waiting out one exhausted rate limit and retrying once.
    async fn send(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        let response = self.send_once(url).await?;
        let Some(reset_at) = rate_limit_reset(&response) else {
            return Ok(response);
        };

        self.wait_until(reset_at).await?;

        let response = self.send_once(url).await?;
        match rate_limit_reset(&response) {
            Some(reset_at) => Err(GitHubError::RateLimited { reset_at }),
            None => Ok(response),
        }
    }

    async fn send_once(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        if self.shutdown.is_shutdown() {
            return Err(GitHubError::Cancelled);
        }

        let request = HttpRequest {
            url: url.to_string(),
            headers: self.headers(),
        };

        self.transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))
    }

    async fn wait_until(&self, reset_at: DateTime<Utc>) -> Result<(), GitHubError> {
        let wait = (reset_at - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
        tracing::warn!(
            reset_at = %reset_at,
            wait_secs = wait.as_secs(),
            "GitHub rate limit exhausted, waiting for reset"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = self.shutdown.wait() => Err(GitHubError::Cancelled),
        }
    }
}

/// Reset time if this response is GitHub's quota-exhausted signal.
///
/// Only 403 with `X-RateLimit-Remaining: 0` counts; other 403s are
/// permission failures. A missing or unparsable reset header means "now".
fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    if response.status != 403 || response.header("x-ratelimit-remaining")?.trim() != "0" {
        return None;
    }

    let reset_at = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .unwrap_or_else(Utc::now);
    Some(reset_at)
}

fn check_status(response: &HttpResponse, resource: &str) -> Result<(), GitHubError> {
    if response.is_success() {
        return Ok(());
    }

    let message = String::from_utf8_lossy(&response.body).to_string();
    match response.status {
        404 => Err(GitHubError::NotFound(resource.to_string())),
        401 | 403 => Err(GitHubError::Unauthorized(message)),
        status => Err(GitHubError::Api { status, message }),
    }
}

#[async_trait]
impl PlatformClient for GitHubClient {
    async fn fetch_repository(&self, owner: &str, name: &str) -> platform::Result<RepoSnapshot> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, name);
        let (repo, _) = self
            .get_json::<GitHubRepo>(&url, &format!("{owner}/{name}"))
            .await?;
        Ok(to_repo_snapshot(repo, owner, name))
    }

    async fn fetch_commits_since(
        &self,
        owner: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> platform::Result<Vec<CommitSnapshot>> {
        let mut pages = self.commit_pages(owner, name, since);
        let mut commits = Vec::new();
        while let Some(page) = pages.next_page().await? {
            commits.extend(page);
        }
        Ok(commits)
    }
}
