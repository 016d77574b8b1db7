//! Error types for ranproc

use thiserror::Error;

use crate::config::ConfigValidationError;

/// Error types shared by the ranproc crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed validation.
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ConfigValidationError),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}
