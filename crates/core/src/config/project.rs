use crate::config::{ConfigError, ConfigValidator, IdentifierValidator, LogLevelValidator, UrlValidator};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the directory, relative to the project root, holding the migration log
pub const MIGRATIONS_DIR_NAME: &str = "migrations";

/// Default name of the table that records applied migrations
pub const DEFAULT_MIGRATIONS_TABLE: &str = "_migrations";

/// Project configuration.
///
/// Every migration component is constructed from one of these, so the
/// location of the project is always passed in rather than taken from the
/// process working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root; the migration log lives in `<root>/migrations`
    pub root: PathBuf,
    /// Tracking table in the target database
    pub migrations_table: String,
    /// Target database, required only for sync
    pub database_url: Option<String>,
    pub log_level: String,
    pub json_logs: bool,
}

impl ProjectConfig {
    /// Create a configuration rooted at `root` with default settings
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            migrations_table: DEFAULT_MIGRATIONS_TABLE.to_string(),
            database_url: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Create a configuration rooted at `root`, overlaying environment variables:
    /// `DATABASE_URL`, `CUBES_MIGRATIONS_TABLE`, `LOG_LEVEL` and `CUBES_LOG_JSON`.
    pub fn from_env(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::new(root);

        config.database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        if let Ok(table) = env::var("CUBES_MIGRATIONS_TABLE") {
            config.migrations_table = table;
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level.to_lowercase();
        }

        if let Ok(json) = env::var("CUBES_LOG_JSON") {
            config.json_logs = json.parse().map_err(|_| {
                ConfigError::invalid_value("json_logs", json, "true or false")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_migrations_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::missing_required(
                "root",
                "pass the project root explicitly",
            ));
        }

        IdentifierValidator::new("migrations_table").validate(self.migrations_table.as_str())?;
        LogLevelValidator.validate(self.log_level.as_str())?;

        if let Some(url) = &self.database_url {
            UrlValidator::default().validate(url.as_str())?;
        }

        Ok(())
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one JSON file per migration
    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join(MIGRATIONS_DIR_NAME)
    }

    /// Database URL, failing when sync was requested without one
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or_else(|| {
            ConfigError::missing_required(
                "database_url",
                "set DATABASE_URL or pass --database-url",
            )
        })
    }
}
