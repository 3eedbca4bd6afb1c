//! Error types for the migration engine
//!
//! One variant family per failure class: argument validation, the
//! file-backed migration log, action decoding, snapshot consistency,
//! database connectivity and sync.

use cubes_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// A required argument is missing or blank
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reading or writing the migration directory failed
    #[error("Migration log I/O error at '{}': {source}", .path.display())]
    LogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted migration record could not be parsed
    #[error("Can't parse migration {id}: {message}")]
    Parse { id: String, message: String },

    /// No migration with this id exists in the log
    #[error("Migration {0} not found")]
    NotFound(String),

    /// An action was appended before any migration was created
    #[error("Migration doesn't exist, please add a migration first")]
    NoMigration,

    /// A new migration id would not sort after the latest existing one
    #[error("Migration id {id} does not sort after the latest migration {latest}")]
    MigrationOrder { id: String, latest: String },

    /// An action record has an unknown method or a payload of the wrong shape.
    ///
    /// `migration_id` and `index` are set when the record came from the log.
    #[error("Can't decode action '{method}'{}: {message}", at_action(.migration_id, .index))]
    Decode {
        method: String,
        message: String,
        migration_id: Option<String>,
        index: Option<usize>,
    },

    /// Replaying an action violated the schema built from the preceding actions
    #[error("Can't apply action #{index} ({method}) of migration {migration_id} to snapshot: {violation}")]
    SchemaConsistency {
        migration_id: String,
        index: usize,
        method: String,
        #[source]
        violation: SchemaViolation,
    },

    /// The target database is unreachable
    #[error("Can't connect to database: {0}")]
    Connection(String),

    /// Applying pending migrations failed; the transaction was rolled back
    #[error("Sync failed{}: {message}", at_migration(.migration_id))]
    Sync {
        migration_id: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrmError {
    pub(crate) fn log_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OrmError::LogIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn sync(migration_id: Option<&str>, message: impl Into<String>) -> Self {
        OrmError::Sync {
            migration_id: migration_id.map(str::to_string),
            message: message.into(),
        }
    }

    pub(crate) fn decode(method: impl Into<String>, message: impl Into<String>) -> Self {
        OrmError::Decode {
            method: method.into(),
            message: message.into(),
            migration_id: None,
            index: None,
        }
    }

    /// Attach the position in the log to a decode error; other errors pass through
    pub(crate) fn in_migration(self, id: &str, position: usize) -> Self {
        match self {
            OrmError::Decode { method, message, .. } => OrmError::Decode {
                method,
                message,
                migration_id: Some(id.to_string()),
                index: Some(position),
            },
            other => other,
        }
    }

    /// The consistency violation behind a failed replay, if that is what this is
    pub fn violation(&self) -> Option<&SchemaViolation> {
        match self {
            OrmError::SchemaConsistency { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

fn at_migration(migration_id: &Option<String>) -> String {
    migration_id
        .as_ref()
        .map(|id| format!(" at migration {}", id))
        .unwrap_or_default()
}

fn at_action(migration_id: &Option<String>, index: &Option<usize>) -> String {
    match (migration_id, index) {
        (Some(id), Some(index)) => format!(" (action #{} of migration {})", index, id),
        (Some(id), None) => format!(" (migration {})", id),
        _ => String::new(),
    }
}

/// A snapshot precondition that an action did not meet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("table doesn't exist: {0}")]
    TableMissing(String),

    #[error("table {table} is referenced by relation {relation} of table {by}")]
    TableReferenced {
        table: String,
        relation: String,
        by: String,
    },

    #[error("column already exists: {table}.{column}")]
    ColumnExists { table: String, column: String },

    #[error("column doesn't exist: {table}.{column}")]
    ColumnMissing { table: String, column: String },

    #[error("column {table}.{column} is used by {constraint}")]
    ColumnInUse {
        table: String,
        column: String,
        constraint: String,
    },

    #[error("primary key already exists on table {0}")]
    PrimaryKeyExists(String),

    #[error("primary key doesn't exist on table {0}")]
    PrimaryKeyMissing(String),

    #[error("relation already exists: {table}.{name}")]
    RelationExists { table: String, name: String },

    #[error("relation doesn't exist: {table}.{name}")]
    RelationMissing { table: String, name: String },

    #[error("relation {name} maps {columns} columns onto {referenced} referenced columns")]
    RelationArity {
        name: String,
        columns: usize,
        referenced: usize,
    },

    #[error("unique constraint already exists: {table}.{name}")]
    UniqueConstraintExists { table: String, name: String },

    #[error("unique constraint doesn't exist: {table}.{name}")]
    UniqueConstraintMissing { table: String, name: String },

    #[error("constraint name {name} is already used on table {table}")]
    ConstraintNameTaken { table: String, name: String },

    #[error("{0} requires at least one column")]
    EmptyColumnList(String),
}
