//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// A line could not be parsed into a sample
    #[error("failed to parse sample at line {line}: {message}")]
    ParseFailed {
        /// 1-based line number
        line: usize,
        /// Parser message
        message: String,
    },

    /// Underlying reader failed
    #[error("io error at line {line}: {source}")]
    Io {
        /// 1-based line number
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
