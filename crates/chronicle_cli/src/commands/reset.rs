use chronicle::shutdown::ShutdownSignal;

use crate::commands::shared::{build_syncer, print_outcome, resolve_repo};
use crate::config::Config;

/// Replay the last `days` of history for one repository.
pub(crate) async fn handle_reset_sync(
    repo: Option<&str>,
    days: u32,
    config: &Config,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.sync_settings()?;
    let db = chronicle::connect_and_migrate_with(&config.database_settings()?).await?;
    let key = resolve_repo(repo, &db, &settings.target).await?;
    let syncer = build_syncer(&settings, db, shutdown)?;

    let outcome = syncer.reset_sync(&key, days).await?;
    tracing::info!(repo = %key, days, "Successfully reset sync point");
    print_outcome(&key, &outcome);
    Ok(())
}
