//! Database connection utilities.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Default pool ceiling.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;

/// Default connection lifetime before recycling.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(300);

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Connection string (e.g. `sqlite:///path/to/db?mode=rwc` or `postgres:///chronicle`).
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            max_lifetime: DEFAULT_MAX_LIFETIME,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// `(max, min)` pool bounds. In-memory SQLite is pinned to one
    /// connection, since every other connection would see its own empty
    /// database.
    fn pool_bounds(&self) -> (u32, u32) {
        let max = if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        };
        (max, self.min_connections.min(max))
    }

    fn connect_options(&self) -> ConnectOptions {
        let (max, min) = self.pool_bounds();
        let mut opts = ConnectOptions::new(self.url.clone());
        opts.max_connections(max)
            .min_connections(min)
            .max_lifetime(self.max_lifetime)
            .sqlx_logging(false);
        opts
    }
}

/// SQLite pools built from sqlx connect options, so the pragmas apply to
/// every pooled connection rather than only the first:
/// - `journal_mode=WAL` for concurrent readers alongside one writer
/// - `busy_timeout=5000` to wait on locks instead of failing immediately
/// - `synchronous=NORMAL`, safe under WAL
#[cfg(feature = "sqlite")]
mod sqlite {
    use std::str::FromStr;
    use std::time::Duration;

    use sea_orm::{DatabaseConnection, DbErr, RuntimeErr, SqlxSqliteConnector};
    use sqlx::ConnectOptions as _;
    use sqlx::sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
    };

    use super::DatabaseSettings;

    const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    fn conn_err(e: sqlx::Error) -> DbErr {
        DbErr::Conn(RuntimeErr::Internal(e.to_string()))
    }

    pub(super) async fn connect(settings: &DatabaseSettings) -> Result<DatabaseConnection, DbErr> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .map_err(conn_err)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true)
            .disable_statement_logging();

        let (max, min) = settings.pool_bounds();
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .min_connections(min)
            .max_lifetime(settings.max_lifetime)
            .connect_with(options)
            .await
            .map_err(conn_err)?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }
}

/// Establish a connection with default pool settings.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    connect_with(&DatabaseSettings::new(database_url)).await
}

/// Establish a connection using explicit pool settings.
///
/// SQLite connections are opened with WAL mode, a 5 second busy timeout and
/// NORMAL synchronous mode.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect_with(settings: &DatabaseSettings) -> Result<DatabaseConnection, DbErr> {
    #[cfg(feature = "sqlite")]
    let db = if settings.url.starts_with("sqlite:") {
        sqlite::connect(settings).await?
    } else {
        Database::connect(settings.connect_options()).await?
    };
    #[cfg(not(feature = "sqlite"))]
    let db = Database::connect(settings.connect_options()).await?;

    tracing::debug!(
        max_connections = settings.max_connections,
        "Database connection established"
    );
    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or migrations fail.
///
/// # Example
/// ```ignore
/// let db = chronicle::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    connect_and_migrate_with(&DatabaseSettings::new(database_url)).await
}

/// [`connect_with`] followed by all pending migrations.
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate_with(
    settings: &DatabaseSettings,
) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect_with(settings).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_urls_are_pinned_to_one_connection() {
        let settings = DatabaseSettings::new("sqlite::memory:");
        assert!(settings.is_in_memory());
        assert_eq!(settings.pool_bounds(), (1, 0));
        assert_eq!(settings.connect_options().get_max_connections(), Some(1));

        let file = DatabaseSettings::new("sqlite:///tmp/chronicle.db?mode=rwc");
        assert!(!file.is_in_memory());
        assert_eq!(
            file.connect_options().get_max_connections(),
            Some(DEFAULT_MAX_CONNECTIONS)
        );
    }

    #[test]
    fn min_connections_never_exceed_max() {
        let mut settings = DatabaseSettings::new("postgres://localhost/chronicle");
        settings.max_connections = 4;
        settings.min_connections = 10;
        assert_eq!(settings.pool_bounds(), (4, 4));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn every_pooled_sqlite_connection_gets_the_pragmas() {
        use sea_orm::{ConnectionTrait, DbBackend, Statement, TransactionTrait};

        let path = std::env::temp_dir().join(format!(
            "chronicle-pragmas-{}.db",
            std::process::id()
        ));
        let mut settings = DatabaseSettings::new(format!("sqlite://{}?mode=rwc", path.display()));
        settings.max_connections = 2;
        let db = connect_with(&settings).await.expect("connect");

        // Hold one connection so the pragma reads below run on the other.
        let txn = db.begin().await.expect("begin");
        let pragma = |name: &str| Statement::from_string(DbBackend::Sqlite, format!("PRAGMA {name}"));

        let row = db
            .query_one(pragma("synchronous"))
            .await
            .expect("query")
            .expect("row");
        let synchronous: i32 = row.try_get_by_index(0).expect("synchronous");
        let row = db
            .query_one(pragma("busy_timeout"))
            .await
            .expect("query")
            .expect("row");
        let busy_timeout: i32 = row.try_get_by_index(0).expect("busy_timeout");
        let row = db
            .query_one(pragma("journal_mode"))
            .await
            .expect("query")
            .expect("row");
        let journal_mode: String = row.try_get_by_index(0).expect("journal_mode");

        txn.rollback().await.expect("rollback");
        db.close().await.expect("close");
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }

        // NORMAL
        assert_eq!(synchronous, 1);
        assert_eq!(busy_timeout, 5000);
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let err = connect("this-is-not-a-db-url")
            .await
            .expect_err("invalid URL should error");
        let msg = err.to_string().to_ascii_lowercase();
        assert!(
            msg.contains("error") || msg.contains("invalid"),
            "unexpected error message: {err}"
        );
    }
}
