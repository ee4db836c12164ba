//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Input file not found
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    /// Configuration or engine contract error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// Sample reading error
    #[error("Failed to read samples: {0}")]
    Ingestion(#[from] ingestion::IngestionError),

    /// Output serialization error
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
