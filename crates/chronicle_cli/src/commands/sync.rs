use chronicle::shutdown::ShutdownSignal;

use crate::commands::shared::{build_syncer, print_outcome, resolve_repo};
use crate::config::Config;

/// One pass for a single repository, starting at its stored cursor.
pub(crate) async fn handle_sync(
    repo: Option<&str>,
    config: &Config,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.sync_settings()?;
    let db = chronicle::connect_and_migrate_with(&config.database_settings()?).await?;
    let key = resolve_repo(repo, &db, &settings.target).await?;
    let syncer = build_syncer(&settings, db, shutdown)?;

    let outcome = syncer
        .sync_from_cursor(&key, settings.monitor.history_start)
        .await?;
    print_outcome(&key, &outcome);
    Ok(())
}
