use thiserror::Error;

/// Convenience result type
pub type Result<T> = std::result::Result<T, PlotError>;

/// Everything that can go wrong while rendering results
#[derive(Error, Debug)]
pub enum PlotError {
    /// The drawing backend failed
    #[error("rendering failed: {0}")]
    Backend(String),

    /// No backend for this file format
    #[error("unsupported plot format: {0}")]
    UnsupportedFormat(String),

    /// Nothing to draw
    #[error("{0} is empty")]
    EmptySeries(&'static str),

    /// The recorded series do not fit together
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Maps any backend error into a `PlotError`
pub(crate) fn backend<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Backend(e.to_string())
}
