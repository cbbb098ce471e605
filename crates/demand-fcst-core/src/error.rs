//! Error types for the demand forecasting engine.

use std::fmt;
use thiserror::Error;

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Stage of a recursive forecasting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Feature,
    Normalize,
    Infer,
    Denormalize,
    Feedback,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Feature => "feature",
            Stage::Normalize => "normalize",
            Stage::Infer => "infer",
            Stage::Denormalize => "denormalize",
            Stage::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error types for forecasting operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Insufficient clean rows after feature engineering: need {needed}, got {got}")]
    InsufficientCleanRows { needed: usize, got: usize },

    #[error("Insufficient history: need at least {needed} consecutive months, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Schema mismatch: feature '{field}' is not available")]
    SchemaMismatch { field: String },

    #[error("Artifacts unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("Failed to load artifact '{path}': {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Step {step} failed during {stage}: {source}")]
    StepFailed {
        step: usize,
        stage: Stage,
        #[source]
        source: Box<ForecastError>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ForecastError {
    /// Convert to an error code for FFI.
    pub fn to_code(&self) -> i32 {
        match self {
            ForecastError::InsufficientData { .. } => 1,
            ForecastError::InsufficientCleanRows { .. } => 2,
            ForecastError::InsufficientHistory { .. } => 3,
            ForecastError::SchemaMismatch { .. } => 4,
            ForecastError::ArtifactUnavailable(_) => 5,
            ForecastError::ArtifactLoad { .. } => 6,
            ForecastError::InvalidInput(_) => 7,
            ForecastError::InvalidParameter { .. } => 8,
            // A failed step reports the code of its cause.
            ForecastError::StepFailed { source, .. } => source.to_code(),
            ForecastError::InternalError(_) => 10,
        }
    }

    /// Index of the recursive step that failed, if any.
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            ForecastError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Innermost error, unwrapping step failures.
    pub fn root_cause(&self) -> &ForecastError {
        match self {
            ForecastError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for caller-detectable precondition failures.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.root_cause(),
            ForecastError::InsufficientData { .. }
                | ForecastError::InsufficientCleanRows { .. }
                | ForecastError::InsufficientHistory { .. }
        )
    }

    pub(crate) fn artifact_load(path: &std::path::Path, reason: impl ToString) -> Self {
        ForecastError::ArtifactLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
