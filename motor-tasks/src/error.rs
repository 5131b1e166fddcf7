use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for task operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors raised while setting up a task or loading its target data
#[derive(Debug, Error)]
pub enum TaskError {
    /// The dataset file does not exist
    #[error("dataset file not found: {path}")]
    DatasetNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// The dataset file exists but could not be understood
    #[error("malformed dataset {path}: {reason}")]
    MalformedDataset {
        /// Path of the dataset
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// The task parameters are inconsistent
    #[error("invalid task configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}
