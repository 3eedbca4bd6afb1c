//! # cubes-orm: schema migrations for cubes projects
//!
//! An append-only log of schema-change actions, stored as one JSON file per
//! migration. The log can be replayed in memory into a [`Snapshot`] of the
//! current schema, or synced to a PostgreSQL database, applying only what
//! the database has not seen yet inside a single transaction.
//!
//! ```no_run
//! use cubes_core::ProjectConfig;
//! use cubes_orm::{MigrationConfig, MigrationManager};
//!
//! # fn main() -> cubes_orm::OrmResult<()> {
//! let project = ProjectConfig::new("/srv/shop");
//! let manager = MigrationManager::with_config(MigrationConfig::from_project(&project));
//!
//! manager.create_migration("create users")?;
//! manager.add_table("users")?;
//! manager.add_column("users", "id", "uuid", false, "")?;
//!
//! let snapshot = manager.current_snapshot()?;
//! assert_eq!(snapshot.tables[0].name, "users");
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod migrations;

pub use database::{PgBackend, PgSyncTransaction, PoolConfig, PoolError};
pub use error::{OrmError, OrmResult, SchemaViolation};
pub use migrations::*;
