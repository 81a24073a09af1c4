//! Error types for analysis and export

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Nothing to analyse: {0}")]
    InvalidAnalysis(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
