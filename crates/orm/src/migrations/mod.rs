//! Migration System
//!
//! The append-only migration log, its action codec, the snapshot built by
//! replaying it, and the runner that syncs it to a database.

pub mod actions;
pub mod definitions;
pub mod manager;
pub mod runner;
pub mod schema_builder;
pub mod snapshot;

pub use actions::*;
pub use definitions::*;
pub use manager::MigrationManager;
pub use runner::{MigrationRunner, SyncBackend, SyncTransaction};
pub use snapshot::{Column, Relation, Snapshot, Table, UniqueConstraint};
