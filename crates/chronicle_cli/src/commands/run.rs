use chronicle::ErrorKind;
use chronicle::shutdown::ShutdownSignal;
use chronicle::sync::Monitor;

use crate::commands::shared::build_syncer;
use crate::config::Config;

/// Migrate, sync the configured repository once, then monitor every tracked
/// repository until shutdown.
pub(crate) async fn handle_run(
    config: &Config,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.sync_settings()?;
    let db = chronicle::connect_and_migrate_with(&config.database_settings()?).await?;
    let syncer = build_syncer(&settings, db, shutdown.clone())?;

    tracing::info!(
        repo = %settings.target,
        start_date = %settings.monitor.history_start,
        "Processing initial repository"
    );
    match syncer
        .sync_from_cursor(&settings.target, settings.monitor.history_start)
        .await
    {
        Ok(outcome) => tracing::info!(
            repo = %settings.target,
            fetched = outcome.fetched,
            written = outcome.written,
            "Initial sync complete"
        ),
        Err(e) if e.kind() == ErrorKind::Cancelled => return Ok(()),
        // The monitor retries on its next tick.
        Err(e) => tracing::warn!(
            repo = %settings.target,
            kind = %e.kind(),
            error = %e,
            "Initial sync failed"
        ),
    }

    let handle = Monitor::new(syncer, settings.monitor.clone(), shutdown).spawn();
    let mut state = handle.subscribe();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            tracing::debug!(state = ?current, "Monitor state changed");
        }
    });
    handle.join().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
