use thiserror::Error;

/// Failures that abort a calculation.
///
/// Per-cell and per-branch problems (formula failures, a failed exchange
/// fetch during graph resolution) are logged and absorbed where they occur
/// and never show up here.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data source error: {0}")]
    Source(#[from] anyhow::Error),

    #[error("Calculation task failed: {0}")]
    Task(String),
}

pub type CalcResult<T> = Result<T, CalcError>;

impl From<tokio::task::JoinError> for CalcError {
    fn from(error: tokio::task::JoinError) -> Self {
        CalcError::Task(error.to_string())
    }
}
