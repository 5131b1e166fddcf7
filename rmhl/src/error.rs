use std::path::PathBuf;

use motor_tasks::TaskError;
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, RmhlError>;

/// Fatal conditions of building, running and persisting a model
#[derive(Debug, Error)]
pub enum RmhlError {
    /// A configuration file does not exist
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// A configuration key is missing or holds an invalid value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Sizes that have to agree do not
    #[error("dimension mismatch of {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// What was measured
        what: &'static str,
        /// Size implied by the configuration
        expected: usize,
        /// Size actually found
        found: usize,
    },

    /// A phase of the run was requested before the phase it depends on
    #[error("cannot {requested} a model that is {state}")]
    OutOfOrder {
        /// The requested phase
        requested: &'static str,
        /// The current state of the model
        state: &'static str,
    },

    /// The result file does not exist
    #[error("result file not found: {path}")]
    ResultsNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Error from the task collaborator
    #[error(transparent)]
    Task(#[from] TaskError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialisation error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
