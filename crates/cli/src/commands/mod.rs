pub mod migration;
pub mod schema;
pub mod sync;

use cubes_core::ProjectConfig;
use cubes_orm::{MigrationConfig, MigrationManager};

/// Migration manager for the project at `config.root`
pub fn manager_for(config: &ProjectConfig) -> MigrationManager {
    MigrationManager::with_config(MigrationConfig::from_project(config))
}
