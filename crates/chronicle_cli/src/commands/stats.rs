use chrono::{DateTime, Utc};
use chronicle::platform::{RepoKey, RepoKeyError};
use chronicle::store::{self, RepositoryStats};
use clap::ValueEnum;

use crate::config::Config;

/// Output format for statistics.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Show commit statistics for one repository, or every tracked one.
pub(crate) async fn handle_stats(
    repo: Option<&str>,
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = chronicle::connect_and_migrate_with(&config.database_settings()?).await?;

    let keys: Vec<RepoKey> = match repo {
        Some(input) => match input.parse::<RepoKey>() {
            Ok(key) => vec![key],
            Err(RepoKeyError::MissingOwner(name)) => {
                store::find_by_name(&db, &name).await?.iter().map(|r| r.key()).collect()
            }
            Err(e) => return Err(e.into()),
        },
        None => store::list_all(&db).await?.iter().map(|r| r.key()).collect(),
    };

    if keys.is_empty() {
        println!("No repositories tracked yet.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(keys.len());
    for key in &keys {
        rows.push(StatsDisplay::from(store::repository_stats(&db, key).await?));
    }
    println!("{}", StatsDisplay::render_many(rows, output)?);
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct StatsDisplay {
    #[tabled(rename = "Repository")]
    pub(crate) repository: String,
    #[tabled(rename = "Commits")]
    pub(crate) total_commits: u64,
    #[tabled(rename = "Authors")]
    pub(crate) unique_authors: u64,
    #[tabled(rename = "First Commit")]
    pub(crate) first_commit: String,
    #[tabled(rename = "Last Commit")]
    pub(crate) last_commit: String,
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl From<RepositoryStats> for StatsDisplay {
    fn from(stats: RepositoryStats) -> Self {
        Self {
            repository: stats.repository,
            total_commits: stats.total_commits,
            unique_authors: stats.unique_authors,
            first_commit: format_date(stats.first_commit),
            last_commit: format_date(stats.last_commit),
        }
    }
}

impl StatsDisplay {
    pub(crate) fn render_many(
        mut items: Vec<Self>,
        format: OutputFormat,
    ) -> Result<String, serde_json::Error> {
        items.sort_by(|a, b| a.repository.cmp(&b.repository));

        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                Ok(table.to_string())
            }
            OutputFormat::Json => serde_json::to_string_pretty(&items),
        }
    }
}
