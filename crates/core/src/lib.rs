//! # cubes-core
//!
//! Shared foundation for the cubes toolkit: the explicit project
//! configuration every migration component is constructed from, and the
//! structured logging bootstrap used by the command-line front end.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigValidator, IdentifierValidator, LogLevelValidator, ProjectConfig, UrlValidator};
pub use logging::{init_logging, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get toolkit version
pub fn version() -> &'static str {
    VERSION
}
