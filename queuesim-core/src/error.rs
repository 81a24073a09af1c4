//! Error types for the simulation engine

use crate::types::StageId;
use thiserror::Error;

/// Top-level error type for simulation operations
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Stage already registered: {id}")]
    DuplicateStage { id: StageId },

    #[error("Stage not found with ID: {id}")]
    StageNotFound { id: StageId },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),
}

/// Errors raised while constructing a distribution
#[derive(Debug, Error, PartialEq)]
pub enum DistributionError {
    #[error("Mean must be positive and finite, got {0}")]
    InvalidMean(f64),

    #[error("Invalid range: min {min:?} must be below max {max:?}")]
    InvalidRange {
        min: std::time::Duration,
        max: std::time::Duration,
    },

    #[error("Invalid triangular shape: require min <= mode <= max and min < max")]
    InvalidShape,

    #[error("A sequence distribution needs at least one value")]
    EmptySequence,
}
