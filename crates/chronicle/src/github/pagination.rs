//! Link-header pagination over the commit list endpoint.

use chrono::{DateTime, Utc};

use crate::http::header_get;
use crate::platform::CommitSnapshot;

use super::client::{GitHubClient, PAGE_SIZE};
use super::convert::to_commit_snapshot;
use super::error::GitHubError;
use super::types::GitHubCommit;

/// Pagination info parsed from a `Link` response header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// Whether a `rel="next"` link was present at all.
    pub has_next: bool,
    /// The next page number, when the link carries a `page` parameter.
    pub next_page: Option<u32>,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/repos/o/r/commits?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
///
/// Only `rel="next"` drives paging.
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some("next")) = (url, rel) {
            info.has_next = true;
            info.next_page = extract_page_from_url(url);
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Lazy walk over every page of a repository's commits.
///
/// Each call to [`CommitPages::next_page`] issues at most one page request
/// (plus the single rate-limit retry). The walk ends on an empty page or
/// when the response carries no `rel="next"` link.
pub struct CommitPages<'a> {
    client: &'a GitHubClient,
    owner: &'a str,
    name: &'a str,
    since: Option<DateTime<Utc>>,
    next: Option<u32>,
}

impl<'a> CommitPages<'a> {
    pub(super) fn new(
        client: &'a GitHubClient,
        owner: &'a str,
        name: &'a str,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            client,
            owner,
            name,
            since,
            next: Some(1),
        }
    }

    /// Fetch the next page, or `None` once the walk is finished.
    pub async fn next_page(&mut self) -> Result<Option<Vec<CommitSnapshot>>, GitHubError> {
        let Some(page) = self.next else {
            return Ok(None);
        };

        let url = self
            .client
            .commits_url(self.owner, self.name, self.since, page, PAGE_SIZE)?;
        let resource = format!("{}/{} commits", self.owner, self.name);
        let (items, headers) = self
            .client
            .get_json::<Vec<GitHubCommit>>(&url, &resource)
            .await?;

        if items.is_empty() {
            self.next = None;
            return Ok(None);
        }

        let link = header_get(&headers, "link")
            .map(parse_link_header)
            .unwrap_or_default();
        self.next = match (link.has_next, link.next_page) {
            (false, _) => None,
            (true, Some(n)) if n > page => Some(n),
            (true, _) => Some(page + 1),
        };

        tracing::debug!(
            repo = %format!("{}/{}", self.owner, self.name),
            page,
            count = items.len(),
            more = self.next.is_some(),
            "Fetched commit page"
        );

        items
            .into_iter()
            .map(to_commit_snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}
