use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    /// Required scripts, configs or directories are missing. Raised before any job starts.
    #[error("prerequisites not met: {}", .0.join("; "))]
    Prerequisite(Vec<String>),

    /// Split ratios rejected before any file is touched.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid job config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("job {job} cannot move from {from} to {to}")]
    InvalidTransition { job: String, from: String, to: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
