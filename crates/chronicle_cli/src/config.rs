//! Configuration file support for chronicle.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (prefixed with `CHRONICLE_`, nested with `__`,
//!    e.g. `CHRONICLE_SYNC__POLL_INTERVAL_SECS`)
//! 2. `./chronicle.toml`
//! 3. `~/.config/chronicle/config.toml`
//! 4. Plain `GITHUB_TOKEN`, `REPO_OWNER`, `REPO_NAME`, `POLL_INTERVAL` and
//!    `START_DATE` environment variables
//! 5. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/chronicle/chronicle.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/chronicle"  # optional
//! max_connections = 25
//!
//! [github]
//! token = "ghp_..."  # or use CHRONICLE_GITHUB__TOKEN / GITHUB_TOKEN
//! owner = "acme"
//! repo = "widget"
//!
//! [sync]
//! poll_interval_secs = 3600
//! start_date = "2024-01-01T00:00:00Z"
//! concurrency = 5
//! batch_size = 1000
//! write_concurrency = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chronicle::DatabaseSettings;
use chronicle::github::{GITHUB_API_URL, GitHubSettings};
use chronicle::platform::{RepoKey, RepoKeyError};
use chronicle::store::WriterSettings;
use chronicle::sync::MonitorOptions;
use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigBuilder as Builder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Plain environment variables honored below every other source.
const ENV_FALLBACKS: [(&str, &str); 5] = [
    ("GITHUB_TOKEN", "github.token"),
    ("REPO_OWNER", "github.owner"),
    ("REPO_NAME", "github.repo"),
    ("POLL_INTERVAL", "sync.poll_interval_secs"),
    ("START_DATE", "sync.start_date"),
];

/// Errors that make the configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required setting `{0}`")]
    Missing(&'static str),

    #[error("Invalid sync.start_date '{value}': {source}")]
    InvalidStartDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error(transparent)]
    InvalidTarget(#[from] RepoKeyError),

    #[error("Could not determine a default database location; set database.url")]
    NoDatabaseUrl,
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: chronicle::db::DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            max_lifetime_secs: chronicle::db::DEFAULT_MAX_LIFETIME.as_secs(),
        }
    }
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    pub token: Option<String>,
    /// Owner of the tracked repository.
    pub owner: Option<String>,
    /// Name of the tracked repository.
    pub repo: Option<String>,
    /// API root override for GitHub Enterprise.
    pub api_url: Option<String>,
}

/// Sync and monitoring options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    /// RFC 3339 lower bound for repositories with no stored commits.
    pub start_date: String,
    /// Repositories synced at once per tick.
    pub concurrency: usize,
    /// Commits per write chunk.
    pub batch_size: usize,
    /// Chunks written at once.
    pub write_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            start_date: "2024-01-01T00:00:00Z".to_string(),
            concurrency: chronicle::sync::DEFAULT_CONCURRENCY,
            batch_size: chronicle::store::DEFAULT_BATCH_SIZE,
            write_concurrency: chronicle::store::DEFAULT_WRITE_CONCURRENCY,
        }
    }
}

/// Everything a sync command needs, checked.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub github: GitHubSettings,
    pub target: RepoKey,
    pub monitor: MonitorOptions,
    pub writer: WriterSettings,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = with_env_fallbacks(ConfigBuilder::builder(), |key| {
            std::env::var(key).ok()
        })?;

        // Add XDG config file if it exists
        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // Add local config file (higher priority than XDG)
        let local_config = PathBuf::from("chronicle.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./chronicle.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., CHRONICLE_DATABASE__URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("CHRONICLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize::<Config>()?)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("chronicle.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn database_settings(&self) -> Result<DatabaseSettings, ConfigError> {
        let url = self.database_url().ok_or(ConfigError::NoDatabaseUrl)?;
        let mut settings = DatabaseSettings::new(url);
        settings.max_connections = self.database.max_connections;
        settings.min_connections = self.database.min_connections;
        settings.max_lifetime = Duration::from_secs(self.database.max_lifetime_secs);
        Ok(settings)
    }

    /// Check required values and build typed settings for sync commands.
    pub fn sync_settings(&self) -> Result<SyncSettings, ConfigError> {
        let token = required(&self.github.token, "github.token")?;
        let owner = required(&self.github.owner, "github.owner")?;
        let repo = required(&self.github.repo, "github.repo")?;

        let history_start = DateTime::parse_from_rfc3339(self.sync.start_date.trim())
            .map_err(|source| ConfigError::InvalidStartDate {
                value: self.sync.start_date.clone(),
                source,
            })?
            .with_timezone(&Utc);

        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::Zero("sync.poll_interval_secs"));
        }
        if self.sync.concurrency == 0 {
            return Err(ConfigError::Zero("sync.concurrency"));
        }
        if self.sync.batch_size == 0 {
            return Err(ConfigError::Zero("sync.batch_size"));
        }
        if self.sync.write_concurrency == 0 {
            return Err(ConfigError::Zero("sync.write_concurrency"));
        }

        let mut github = GitHubSettings::new(token);
        github.api_url = self
            .github
            .api_url
            .clone()
            .unwrap_or_else(|| GITHUB_API_URL.to_string());

        Ok(SyncSettings {
            github,
            target: RepoKey::new(owner, repo),
            monitor: MonitorOptions {
                poll_interval: Duration::from_secs(self.sync.poll_interval_secs),
                concurrency: self.sync.concurrency,
                history_start,
            },
            writer: WriterSettings {
                batch_size: self.sync.batch_size,
                concurrency: self.sync.write_concurrency,
            },
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "chronicle").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/chronicle` or `~/.local/state/chronicle`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "chronicle").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn required(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(key))
}

/// Seed the builder's defaults from plain environment variables.
fn with_env_fallbacks<F>(
    mut builder: Builder<DefaultState>,
    lookup: F,
) -> Result<Builder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in ENV_FALLBACKS {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            builder = builder.set_default(key, value)?;
        }
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_toml(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    fn complete() -> Config {
        from_toml(
            r#"
            [github]
            token = "ghp_test123"
            owner = "acme"
            repo = "widget"
        "#,
        )
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.poll_interval_secs, 3600);
        assert_eq!(config.sync.start_date, "2024-01-01T00:00:00Z");
        assert_eq!(config.sync.concurrency, 5);
        assert_eq!(config.sync.batch_size, 1000);
        assert_eq!(config.sync.write_concurrency, 5);
        assert_eq!(config.database.max_connections, 25);
        assert_eq!(config.database.max_lifetime_secs, 300);
        assert!(config.github.token.is_none());
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [sync]
            poll_interval_secs = 60
        "#,
        );

        assert_eq!(config.sync.poll_interval_secs, 60);
        // Other values should be defaults
        assert_eq!(config.sync.concurrency, 5);
    }

    #[test]
    fn test_sync_settings_from_complete_config() {
        let settings = complete().sync_settings().expect("valid");

        assert_eq!(settings.target, RepoKey::new("acme", "widget"));
        assert_eq!(settings.github.token, "ghp_test123");
        assert_eq!(settings.github.api_url, GITHUB_API_URL);
        assert_eq!(settings.monitor.poll_interval, Duration::from_secs(3600));
        assert_eq!(
            settings.monitor.history_start.to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
        assert_eq!(settings.writer.batch_size, 1000);
    }

    #[test]
    fn test_missing_token_is_reported_by_key() {
        let config = from_toml(
            r#"
            [github]
            owner = "acme"
            repo = "widget"
        "#,
        );
        let err = config.sync_settings().expect_err("no token");
        assert!(matches!(err, ConfigError::Missing("github.token")));
    }

    #[test]
    fn test_invalid_start_date_is_rejected() {
        let mut config = complete();
        config.sync.start_date = "last tuesday".to_string();
        let err = config.sync_settings().expect_err("bad date");
        assert!(matches!(err, ConfigError::InvalidStartDate { .. }));
        assert!(err.to_string().contains("last tuesday"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = complete();
        config.sync.poll_interval_secs = 0;
        let err = config.sync_settings().expect_err("zero interval");
        assert!(matches!(err, ConfigError::Zero("sync.poll_interval_secs")));
    }

    #[test]
    fn test_env_fallbacks_fill_missing_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "ghp_env"),
            ("REPO_OWNER", "acme"),
            ("REPO_NAME", "widget"),
            ("POLL_INTERVAL", "120"),
        ]);
        let builder = with_env_fallbacks(ConfigBuilder::builder(), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        let config: Config = builder.build().unwrap().try_deserialize().unwrap();
        let settings = config.sync_settings().expect("valid");
        assert_eq!(settings.github.token, "ghp_env");
        assert_eq!(settings.target.to_string(), "acme/widget");
        assert_eq!(settings.monitor.poll_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_config_file_overrides_env_fallbacks() {
        let builder = with_env_fallbacks(ConfigBuilder::builder(), |key| {
            (key == "REPO_NAME").then(|| "from-env".to_string())
        })
        .unwrap()
        .add_source(config::File::from_str(
            r#"
            [github]
            repo = "from-file"
        "#,
            FileFormat::Toml,
        ));

        let config: Config = builder.build().unwrap().try_deserialize().unwrap();
        assert_eq!(config.github.repo.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let config = Config::default();
        let url = config.database_url().expect("default url");
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("chronicle.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_database_settings_carry_pool_limits() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/chronicle"
            max_connections = 10
            max_lifetime_secs = 60
        "#,
        );
        let settings = config.database_settings().expect("settings");
        assert_eq!(settings.url, "postgres://localhost/chronicle");
        assert_eq!(settings.max_connections, 10);
        assert_eq!(settings.max_lifetime, Duration::from_secs(60));
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[sync", FileFormat::Toml))
            .build();

        assert!(result.is_err());
    }
}
