//! Application error types.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by (or while waiting on) an external LLM collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator call failed: {0}")]
    Failed(String),

    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),
}

/// Application-level errors for Dramatis.
#[derive(Error, Debug)]
pub enum AppError {
    // Sampling and planning
    #[error("Invalid dimension '{dimension}': {reason}")]
    InvalidDimension { dimension: String, reason: String },

    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    #[error("Sampling failed for '{dimension}': {reason}")]
    Sampling { dimension: String, reason: String },

    // Collaborators
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Cannot continue simulation: {0}")]
    ContinuationState(String),

    // Lookups
    #[error("Entity type not found: {0}")]
    EntityTypeNotFound(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Simulation not found: {0}")]
    SimulationNotFound(String),

    #[error("Batch simulation not found: {0}")]
    BatchNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Shorthand for an [`AppError::InvalidDimension`].
    pub fn invalid_dimension(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidDimension {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`AppError::Sampling`].
    pub fn sampling(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Sampling {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for outer surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidDimension { .. } => "INVALID_DIMENSION",
            AppError::InvalidBatchSize(_) => "INVALID_BATCH_SIZE",
            AppError::Sampling { .. } => "SAMPLING_ERROR",
            AppError::Collaborator(CollaboratorError::Timeout(_)) => "COLLABORATOR_TIMEOUT",
            AppError::Collaborator(_) => "COLLABORATOR_ERROR",
            AppError::ContinuationState(_) => "CONTINUATION_STATE",
            AppError::EntityTypeNotFound(_) => "ENTITY_TYPE_NOT_FOUND",
            AppError::EntityNotFound(_) => "ENTITY_NOT_FOUND",
            AppError::SimulationNotFound(_) => "SIMULATION_NOT_FOUND",
            AppError::BatchNotFound(_) => "BATCH_NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_has_distinct_code() {
        let err = AppError::from(CollaboratorError::Timeout(Duration::from_secs(3)));
        assert_eq!(err.code(), "COLLABORATOR_TIMEOUT");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_invalid_dimension_message() {
        let err = AppError::invalid_dimension("age", "min must be less than max");
        assert_eq!(err.code(), "INVALID_DIMENSION");
        assert_eq!(
            err.to_string(),
            "Invalid dimension 'age': min must be less than max"
        );
    }
}
