//! Chronicle CLI - keeps a local mirror of a GitHub repository's commit history.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::stats::OutputFormat;

#[derive(Parser)]
#[command(name = "chronicle")]
#[command(version)]
#[command(about = "Incremental GitHub repository and commit sync")]
#[command(
    long_about = "Chronicle mirrors a GitHub repository's metadata and commit history into a \
local database. It polls on a fixed interval, only fetches commits newer than what is \
already stored, and waits out GitHub rate limits instead of failing."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the sync daemon for the configured repository:
        $ chronicle

    Sync one repository once:
        $ chronicle sync --repo acme/widget

    Replay the last two weeks of history:
        $ chronicle reset-sync --repo widget --days 14

    Show commit statistics as JSON:
        $ chronicle stats --output json

    Generate shell completions:
        $ chronicle completions bash > ~/.local/share/bash-completion/completions/chronicle

CONFIGURATION
    Chronicle reads configuration from:
      1. ~/.config/chronicle/config.toml (or $XDG_CONFIG_HOME/chronicle/config.toml)
      2. ./chronicle.toml
      3. Environment variables (CHRONICLE_* prefix, __ between sections)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    CHRONICLE_DATABASE__URL            Database connection string (default: ~/.local/state/chronicle/chronicle.db)
    CHRONICLE_GITHUB__TOKEN            GitHub personal access token (fallback: GITHUB_TOKEN)
    CHRONICLE_GITHUB__OWNER            Repository owner (fallback: REPO_OWNER)
    CHRONICLE_GITHUB__REPO             Repository name (fallback: REPO_NAME)
    CHRONICLE_SYNC__POLL_INTERVAL_SECS Seconds between polls (fallback: POLL_INTERVAL)
    CHRONICLE_SYNC__START_DATE         RFC 3339 history start (fallback: START_DATE)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the configured repository, then poll every tracked repository (default)
    Run,
    /// Sync one repository once, starting from its stored cursor
    Sync {
        /// Repository as owner/name, or a name under the configured owner
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Re-fetch the last N days of history for one repository
    ResetSync {
        /// Repository as owner/name, or a name under the configured owner
        #[arg(short, long)]
        repo: Option<String>,

        /// Number of days to replay
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Show commit statistics
    Stats {
        /// Repository as owner/name (all tracked repositories if omitted)
        #[arg(short, long)]
        repo: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

fn init_tracing() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("chronicle=info,chronicle_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(Term::stdout().is_term())
        .with_target(false)
        .init();
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    // Handle commands that don't require configuration or database access first
    match &command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let config = config::Config::load()?;
    let database = config.database_settings()?;
    ensure_sqlite_dir(&database.url)?;

    let shutdown = shutdown::setup_shutdown_handler();

    match command {
        Commands::Run => commands::run::handle_run(&config, shutdown).await?,
        Commands::Sync { repo } => {
            commands::sync::handle_sync(repo.as_deref(), &config, shutdown).await?;
        }
        Commands::ResetSync { repo, days } => {
            commands::reset::handle_reset_sync(repo.as_deref(), days, &config, shutdown).await?;
        }
        Commands::Stats { repo, output } => {
            commands::stats::handle_stats(repo.as_deref(), output, &config).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
