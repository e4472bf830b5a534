use chronicle::db::{self, DatabaseSettings};
use chronicle::migration::{Migrator, MigratorTrait};
use console::style;

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    settings: &DatabaseSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect_with(settings).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("{} Schema is up to date", style("✓").green());
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            tracing::info!(applied = pending, "Schema migrated");
            println!("{} Applied {pending} migration(s)", style("✓").green());
        }
        MigrateAction::Down => {
            let Some(last) = Migrator::get_applied_migrations(&db).await?.pop() else {
                println!("Nothing to roll back");
                return Ok(());
            };
            let name = last.name().to_string();
            Migrator::down(&db, Some(1)).await?;
            tracing::info!(migration = %name, "Migration rolled back");
            println!("{} Rolled back {}", style("✓").green(), style(name).bold());
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(&db).await?;
            let pending = Migrator::get_pending_migrations(&db).await?;
            let applied: Vec<&str> = applied.iter().map(|m| m.name()).collect();
            let pending: Vec<&str> = pending.iter().map(|m| m.name()).collect();
            print!("{}", status_report(&applied, &pending));
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping every chronicle table, tracked history will be lost");
            Migrator::fresh(&db).await?;
            println!("{} Schema recreated from scratch", style("✓").green());
        }
    }

    Ok(())
}

/// One line per migration, applied first, in migration order.
fn status_report(applied: &[&str], pending: &[&str]) -> String {
    let mut report = String::new();
    for name in applied {
        report.push_str(&format!("  applied  {name}\n"));
    }
    for name in pending {
        report.push_str(&format!("  pending  {name}\n"));
    }
    if pending.is_empty() {
        report.push_str("Schema is up to date\n");
    } else {
        report.push_str(&format!("{} migration(s) pending\n", pending.len()));
    }
    report
}
