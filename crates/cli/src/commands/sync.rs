use anyhow::Context;
use cubes_core::ProjectConfig;
use cubes_orm::{MigrationManager, MigrationRunner, PoolConfig, SyncReport};
use tracing::{debug, info};

pub async fn run(config: &ProjectConfig, manager: MigrationManager) -> anyhow::Result<()> {
    let database_url = config.require_database_url()?;
    debug!(
        migrations_dir = %manager.migrations_dir().display(),
        table = %manager.config().migrations_table,
        "Starting sync"
    );

    let runner = MigrationRunner::connect(manager, database_url, &PoolConfig::default())
        .await
        .context("can't connect to database")?;
    let report = runner.sync().await.context("sync failed")?;
    info!(
        applied = report.applied_count(),
        frontier = report.frontier().unwrap_or("none"),
        "Database synced"
    );

    print!("{}", summary(&report));
    Ok(())
}

fn summary(report: &SyncReport) -> String {
    if report.applied_migrations.is_empty() {
        return format!(
            "Database is up to date ({})\n",
            report.frontier().unwrap_or("no migrations")
        );
    }

    let mut out = String::new();
    for id in &report.applied_migrations {
        out.push_str(&format!("Applied {}\n", id));
    }
    out.push_str(&format!(
        "{} migration(s), {} statement(s)\n",
        report.applied_count(),
        report.statements_executed
    ));
    out
}
