use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ConstraintViolation(_) => "constraint_violation",
            AppError::StoreFailure(_) => "store_failure",
            AppError::Config(_) => "config",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EstimateConsumed(id) => {
                AppError::ConstraintViolation(format!("estimate {id} has already been ordered"))
            }
            other => AppError::StoreFailure(other.to_string()),
        }
    }
}
