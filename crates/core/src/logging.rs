//! # Structured Logging
//!
//! Logging bootstrap for cubes binaries: a `tracing-subscriber` registry with
//! an `EnvFilter` and either a plain or a JSON formatting layer.
//! `RUST_LOG`, when set, takes precedence over the configured level.

use crate::config::ProjectConfig;
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Include the target module in every line
    pub include_target: bool,
    /// Environment filter (supports directives like "cubes_orm=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_target: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Logging settings derived from the project configuration
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json_format: config.json_logs,
            ..Self::default()
        }
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directives used when `RUST_LOG` is absent.
    ///
    /// sqlx logs every statement at `info`, which would drown out the sync
    /// engine's own output, so it is capped at `warn` unless overridden.
    pub fn directives(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!("{},sqlx=warn", self.level),
        }
    }
}

/// Initialize structured logging for the process.
///
/// Fails if the filter cannot be parsed or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config.directives()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(config.include_target).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(config.include_target))
            .try_init()?;
    }

    tracing::debug!(
        target: "cubes::logging",
        level = %config.level,
        json = config.json_format,
        "Logging initialized"
    );

    Ok(())
}
