//! Error types.

use thiserror::Error;

/// Failure to construct a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("terminal type {term:?} is not supported")]
    UnsupportedTerminal { term: String },

    #[error("standard input and output must both be terminals")]
    NotATty,

    #[error("invalid screen size {columns}x{rows}")]
    InvalidSize { columns: usize, rows: usize },

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a screen lifecycle operation.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Both the plain and the xterm-override construction attempts failed.
    #[error("failed to construct terminal backend (also tried TERM={fallback_term}): {source}")]
    BackendConstruction {
        fallback_term: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("failed to initialize terminal backend: {0}")]
    BackendInit(#[source] std::io::Error),

    #[error("failed to create simulation screen: {0}")]
    Simulation(#[source] BackendError),
}
