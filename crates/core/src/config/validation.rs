use thiserror::Error;
use url::Url;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Database URL validator
pub struct UrlValidator {
    pub schemes: Vec<String>,
    pub require_host: bool,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self {
            schemes: vec!["postgres".to_string(), "postgresql".to_string()],
            require_host: true,
        }
    }
}

impl ConfigValidator<str> for UrlValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::invalid_value(
                "database_url",
                value,
                "non-empty URL",
            ));
        }

        let url = Url::parse(value).map_err(|e| {
            ConfigError::invalid_value("database_url", value, format!("valid URL ({})", e))
        })?;

        if !self.schemes.iter().any(|scheme| scheme == url.scheme()) {
            return Err(ConfigError::invalid_value(
                "database_url",
                value,
                format!("URL with scheme: {}", self.schemes.join(", ")),
            ));
        }

        if self.require_host {
            // libpq also takes the host (or a socket directory) from `?host=`
            let has_host = url.host_str().map_or(false, |host| !host.is_empty())
                || url
                    .query_pairs()
                    .any(|(key, value)| key == "host" && !value.is_empty());
            if !has_host {
                return Err(ConfigError::invalid_value(
                    "database_url",
                    value,
                    "URL with a host or a host query parameter",
                ));
            }
        }

        Ok(())
    }
}

/// Validator for SQL identifiers that are interpolated by the toolkit itself,
/// such as the tracking table name.
pub struct IdentifierValidator {
    pub field: &'static str,
    pub max_len: usize,
}

impl IdentifierValidator {
    pub fn new(field: &'static str) -> Self {
        // Postgres NAMEDATALEN - 1
        Self { field, max_len: 63 }
    }
}

impl ConfigValidator<str> for IdentifierValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        let mut chars = value.chars();
        let starts_ok = chars
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !starts_ok || !rest_ok || value.len() > self.max_len {
            return Err(ConfigError::invalid_value(
                self.field,
                value,
                format!(
                    "identifier of letters, digits and underscores, at most {} characters",
                    self.max_len
                ),
            ));
        }
        Ok(())
    }
}

/// Log level validator
pub struct LogLevelValidator;

impl LogLevelValidator {
    pub const LEVELS: [&'static str; 5] = ["error", "warn", "info", "debug", "trace"];
}

impl ConfigValidator<str> for LogLevelValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if !Self::LEVELS.contains(&value) {
            return Err(ConfigError::invalid_value(
                "log_level",
                value,
                format!("one of: {}", Self::LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}
