use anyhow::Context;
use cubes_orm::MigrationManager;

pub fn add(manager: &MigrationManager, description: &str) -> anyhow::Result<()> {
    let id = manager
        .create_migration(description)
        .context("can't create migration")?;
    println!("Created migration {}", id);
    Ok(())
}

pub fn list(manager: &MigrationManager) -> anyhow::Result<()> {
    let migrations = manager.load_migrations().context("can't read migrations")?;

    if migrations.is_empty() {
        println!("No migrations found in {}", manager.migrations_dir().display());
        return Ok(());
    }

    for migration in &migrations {
        println!(
            "{}  {:<40} {} action(s)",
            migration.id,
            migration.description,
            migration.actions.len()
        );
    }
    Ok(())
}

pub fn show(manager: &MigrationManager, id: &str) -> anyhow::Result<()> {
    let migration = manager
        .get_migration(id)
        .with_context(|| format!("can't read migration {}", id))?;

    println!("{}  {}", migration.id, migration.description);
    for (index, record) in migration.actions.iter().enumerate() {
        println!("  {:>3}. {} {}", index + 1, record.method, record.params);
    }
    Ok(())
}
