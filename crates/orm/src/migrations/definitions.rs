//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the persisted migration record, the configuration the log store
//! and sync engine are built from, and the result of a sync.

use chrono::{DateTime, Utc};
use cubes_core::ProjectConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::actions::ActionRecord;

/// Version written to every migration file
pub const SCHEMA_VERSION: &str = "1";

/// Timestamp layout of migration ids: 14 digits, so lexicographic order is chronological
pub const MIGRATION_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// A migration: an ordered batch of actions created as a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub schema_version: String,
    /// Creation time, `YYYYMMDDhhmmss` in UTC
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

impl Migration {
    /// Create an empty migration with an id derived from `created_at`
    pub fn new(description: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            id: migration_id(created_at),
            description: description.into(),
            actions: Vec::new(),
        }
    }
}

/// Derive a migration id from a point in time (second resolution)
pub fn migration_id(at: DateTime<Utc>) -> String {
    at.format(MIGRATION_ID_FORMAT).to_string()
}

/// Whether `id` has the shape of a migration id
pub fn is_migration_id(id: &str) -> bool {
    id.len() == 14 && id.bytes().all(|b| b.is_ascii_digit())
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
}

impl MigrationConfig {
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            migrations_dir: config.migrations_dir(),
            migrations_table: config.migrations_table.clone(),
        }
    }
}

impl From<&ProjectConfig> for MigrationConfig {
    fn from(config: &ProjectConfig) -> Self {
        Self::from_project(config)
    }
}

/// Stages a sync passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    Connected,
    TrackingTableReady,
    FrontierKnown,
    Applying,
    Committed,
    RolledBack,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Disconnected => "disconnected",
            SyncState::Connected => "connected",
            SyncState::TrackingTableReady => "tracking-table-ready",
            SyncState::FrontierKnown => "frontier-known",
            SyncState::Applying => "applying",
            SyncState::Committed => "committed",
            SyncState::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Latest applied migration before this sync, `None` on a fresh database
    pub previous_frontier: Option<String>,
    /// Ids of the migrations applied by this sync, in order
    pub applied_migrations: Vec<String>,
    /// Number of DDL statements executed
    pub statements_executed: usize,
}

impl SyncReport {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }

    /// Frontier after this sync
    pub fn frontier(&self) -> Option<&str> {
        self.applied_migrations
            .last()
            .or(self.previous_frontier.as_ref())
            .map(String::as_str)
    }
}
