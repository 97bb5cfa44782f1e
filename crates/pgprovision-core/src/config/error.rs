//! Error types for configuration operations

use thiserror::Error;

/// Errors that can occur while loading credentials or settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from {path}: {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Required environment variable {var} is not set")]
    MissingEnvVar { var: &'static str },

    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },

    #[error("Failed to determine config directory")]
    ConfigDirError,
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
