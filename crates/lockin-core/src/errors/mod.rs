use std::error::Error;

/// Implemented by every error enum in this crate.
pub trait LockinError: Error + Send + Sync + 'static {
    /// Stable code for logs and scripted callers.
    fn error_code(&self) -> &'static str;

    /// Caused by user input or configuration rather than the OS.
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Rejections from `validate_config`. Load failures (missing file, bad TOML)
/// surface from `LockinConfig::load_hierarchy` as the underlying error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid application entry '{name}': {message}")]
    InvalidApplication { name: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl LockinError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::InvalidApplication { .. } => "INVALID_APPLICATION",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
