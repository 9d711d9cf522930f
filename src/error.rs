use thiserror::Error;

use crate::registry::Task;

/// Main error type for inference and evaluation
#[derive(Error, Debug)]
pub enum ClinicError {
    // Request-level errors
    #[error("{0} model not loaded")]
    ModelNotLoaded(Task),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not enough samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Computation failed: {0}")]
    ComputationFailure(String),

    // Artifact errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClinicError {
    /// HTTP-style status for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::InsufficientSamples { .. } | Self::Json(_) => 400,
            _ => 500,
        }
    }

    /// Stable identifier callers can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelNotLoaded(_) => "model_not_loaded",
            Self::InvalidInput(_) => "invalid_input",
            Self::InsufficientSamples { .. } => "insufficient_samples",
            Self::ComputationFailure(_) => "computation_failure",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for ClinicError
pub type Result<T> = std::result::Result<T, ClinicError>;
