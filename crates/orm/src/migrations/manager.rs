//! Migration Manager - the file-backed migration log
//!
//! One JSON file per migration, `<id>.json`, in the project's `migrations`
//! directory. Migrations are created empty and grow by appending actions to
//! the most recent one; older migrations are never rewritten.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::actions::{
    Action, AddColumnParams, AddPrimaryKeyParams, AddRelationParams, AddTableParams,
    AddUniqueConstraintParams, DeleteColumnParams, DeletePrimaryKeyParams, DeleteRelationParams,
    DeleteTableParams, DeleteUniqueConstraintParams,
};
use super::definitions::{is_migration_id, Migration, MigrationConfig, SCHEMA_VERSION};
use super::snapshot::Snapshot;
use crate::error::{OrmError, OrmResult};

const MIGRATION_EXTENSION: &str = "json";

/// Migration manager for creating, extending and loading migrations
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a migration manager with the given configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Directory the log lives in
    pub fn migrations_dir(&self) -> &Path {
        &self.config.migrations_dir
    }

    fn migration_path(&self, id: &str) -> PathBuf {
        self.config
            .migrations_dir
            .join(format!("{}.{}", id, MIGRATION_EXTENSION))
    }

    /// Create an empty migration stamped with the current time
    pub fn create_migration(&self, description: &str) -> OrmResult<String> {
        self.create_migration_at(description, Utc::now())
    }

    /// Create an empty migration stamped with `created_at`.
    ///
    /// Fails if the resulting id does not sort after every existing id, which
    /// includes a second migration created within the same second.
    pub fn create_migration_at(&self, description: &str, created_at: DateTime<Utc>) -> OrmResult<String> {
        require("description", description)?;

        let migration = Migration::new(description, created_at);
        if let Some(latest) = self.load_migrations()?.last() {
            if latest.id >= migration.id {
                return Err(OrmError::MigrationOrder {
                    id: migration.id,
                    latest: latest.id.clone(),
                });
            }
        }

        fs::create_dir_all(&self.config.migrations_dir)
            .map_err(|e| OrmError::log_io(&self.config.migrations_dir, e))?;
        self.write_migration(&migration)?;

        info!(id = %migration.id, description, "Created migration");
        Ok(migration.id)
    }

    /// Append `action` to the most recent migration and return that migration's id.
    ///
    /// The action is not checked against the current schema here; that
    /// happens when the log is replayed.
    pub fn append_action(&self, action: &Action) -> OrmResult<String> {
        let record = action.encode()?;
        let mut latest = self
            .load_migrations()?
            .pop()
            .ok_or(OrmError::NoMigration)?;

        latest.actions.push(record);
        self.write_migration(&latest)?;

        debug!(id = %latest.id, method = %action.kind(), "Appended action to migration");
        Ok(latest.id)
    }

    /// Load every migration, ordered by id
    pub fn load_migrations(&self) -> OrmResult<Vec<Migration>> {
        let dir = &self.config.migrations_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OrmError::log_io(dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| OrmError::log_io(dir, e))?.path();
            if path.extension().map_or(false, |ext| ext == MIGRATION_EXTENSION) {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !is_migration_id(&stem) {
                    return Err(OrmError::Parse {
                        id: stem,
                        message: format!("{} is not named after a migration id", path.display()),
                    });
                }
                ids.push(stem);
            }
        }
        ids.sort();

        let migrations = ids
            .iter()
            .map(|id| self.get_migration(id))
            .collect::<OrmResult<Vec<_>>>()?;

        debug!(count = migrations.len(), dir = %dir.display(), "Loaded migrations");
        Ok(migrations)
    }

    /// Read a single migration by id
    pub fn get_migration(&self, id: &str) -> OrmResult<Migration> {
        if !is_migration_id(id) {
            return Err(OrmError::NotFound(id.to_string()));
        }

        let path = self.migration_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OrmError::NotFound(id.to_string()))
            }
            Err(e) => return Err(OrmError::log_io(path, e)),
        };

        parse_migration(id, &content)
    }

    /// Replay the whole log into the current schema
    pub fn current_snapshot(&self) -> OrmResult<Snapshot> {
        Snapshot::build(&self.load_migrations()?)
    }

    /// Replace the migration's file in one step: write a sibling temp file, then rename it over
    fn write_migration(&self, migration: &Migration) -> OrmResult<()> {
        let path = self.migration_path(&migration.id);
        let tmp_path = path.with_extension(format!("{}.tmp", MIGRATION_EXTENSION));

        let packed = serde_json::to_string_pretty(migration).map_err(|e| OrmError::Parse {
            id: migration.id.clone(),
            message: e.to_string(),
        })?;

        fs::write(&tmp_path, packed).map_err(|e| OrmError::log_io(&tmp_path, e))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(OrmError::log_io(&path, e));
        }
        Ok(())
    }

    pub fn add_table(&self, name: &str) -> OrmResult<String> {
        require("table name", name)?;
        self.append_action(&Action::AddTable(AddTableParams {
            name: name.to_string(),
        }))
    }

    pub fn delete_table(&self, name: &str) -> OrmResult<String> {
        require("table name", name)?;
        self.append_action(&Action::DeleteTable(DeleteTableParams {
            name: name.to_string(),
        }))
    }

    /// An empty `default_value` means the column has no default
    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: &str,
        is_nullable: bool,
        default_value: &str,
    ) -> OrmResult<String> {
        require("table name", table)?;
        require("column name", column)?;
        require("column type", column_type)?;

        self.append_action(&Action::AddColumn(AddColumnParams {
            table: table.to_string(),
            column: column.to_string(),
            column_type: column_type.to_string(),
            is_nullable,
            default_value: Some(default_value)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        }))
    }

    pub fn delete_column(&self, table: &str, column: &str) -> OrmResult<String> {
        require("table name", table)?;
        require("column name", column)?;
        self.append_action(&Action::DeleteColumn(DeleteColumnParams {
            table: table.to_string(),
            column: column.to_string(),
        }))
    }

    pub fn add_primary_key(&self, table: &str, columns: &[String]) -> OrmResult<String> {
        require("table name", table)?;
        require_all("primary key columns", columns)?;
        self.append_action(&Action::AddPrimaryKey(AddPrimaryKeyParams {
            table: table.to_string(),
            columns: columns.to_vec(),
        }))
    }

    pub fn delete_primary_key(&self, table: &str) -> OrmResult<String> {
        require("table name", table)?;
        self.append_action(&Action::DeletePrimaryKey(DeletePrimaryKeyParams {
            table: table.to_string(),
        }))
    }

    pub fn add_relation(
        &self,
        table: &str,
        name: &str,
        columns: &[String],
        referenced_table: &str,
        referenced_columns: &[String],
    ) -> OrmResult<String> {
        require("table name", table)?;
        require("relation name", name)?;
        require_all("relation columns", columns)?;
        require("referenced table", referenced_table)?;
        require_all("referenced columns", referenced_columns)?;
        if columns.len() != referenced_columns.len() {
            return Err(OrmError::Validation(format!(
                "relation {} has {} columns but {} referenced columns",
                name,
                columns.len(),
                referenced_columns.len()
            )));
        }

        self.append_action(&Action::AddRelation(AddRelationParams {
            table: table.to_string(),
            name: name.to_string(),
            columns: columns.to_vec(),
            referenced_table: referenced_table.to_string(),
            referenced_columns: referenced_columns.to_vec(),
        }))
    }

    pub fn delete_relation(&self, table: &str, name: &str) -> OrmResult<String> {
        require("table name", table)?;
        require("relation name", name)?;
        self.append_action(&Action::DeleteRelation(DeleteRelationParams {
            table: table.to_string(),
            name: name.to_string(),
        }))
    }

    pub fn add_unique_constraint(&self, table: &str, name: &str, columns: &[String]) -> OrmResult<String> {
        require("table name", table)?;
        require("constraint name", name)?;
        require_all("constraint columns", columns)?;
        self.append_action(&Action::AddUniqueConstraint(AddUniqueConstraintParams {
            table: table.to_string(),
            name: name.to_string(),
            columns: columns.to_vec(),
        }))
    }

    pub fn delete_unique_constraint(&self, table: &str, name: &str) -> OrmResult<String> {
        require("table name", table)?;
        require("constraint name", name)?;
        self.append_action(&Action::DeleteUniqueConstraint(DeleteUniqueConstraintParams {
            table: table.to_string(),
            name: name.to_string(),
        }))
    }
}

fn require(field: &str, value: &str) -> OrmResult<()> {
    if value.trim().is_empty() {
        return Err(OrmError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_all(field: &str, values: &[String]) -> OrmResult<()> {
    if values.is_empty() {
        return Err(OrmError::Validation(format!("{} are required", field)));
    }
    values.iter().try_for_each(|value| require(field, value))
}

/// Parse a migration file's content, checking it belongs to `id`
fn parse_migration(id: &str, content: &str) -> OrmResult<Migration> {
    let migration: Migration = serde_json::from_str(content).map_err(|e| OrmError::Parse {
        id: id.to_string(),
        message: e.to_string(),
    })?;

    if migration.schema_version != SCHEMA_VERSION {
        return Err(OrmError::Parse {
            id: id.to_string(),
            message: format!("unsupported schema version {}", migration.schema_version),
        });
    }
    if migration.id != id {
        return Err(OrmError::Parse {
            id: id.to_string(),
            message: format!("file holds migration {}", migration.id),
        });
    }

    Ok(migration)
}
