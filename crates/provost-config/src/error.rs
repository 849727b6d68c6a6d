//! Error types for configuration loading.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing failed.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing failed.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable override could not be applied.
    #[error("invalid environment override {key}: {reason}")]
    EnvParse {
        /// The offending variable name.
        key: String,
        /// What was wrong with its value.
        reason: String,
    },

    /// The final configuration failed validation.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Create a file-not-found error.
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a read error.
    pub fn read_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an environment parse error.
    pub fn env_parse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
