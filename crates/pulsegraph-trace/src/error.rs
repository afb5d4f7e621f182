//! Error types for the tracer

use thiserror::Error;

use pulsegraph_core::GraphError;

/// Tracer errors
#[derive(Error, Debug)]
pub enum TraceError {
    /// Open files and traced cells are out of step
    #[error("No files open for tracing (file={files} != {signals}=sig)")]
    CountMismatch { files: usize, signals: usize },

    /// A cell can be traced only once; two writers would share one file
    #[error("Signal {0} is already traced")]
    AlreadyTraced(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Unknown tracer command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument for {command}: {message}")]
    InvalidArgument {
        command: &'static str,
        message: String,
    },

    #[error("Formatting failed")]
    Format(#[from] std::fmt::Error),
}

/// Result type for tracer operations
pub type TraceResult<T> = Result<T, TraceError>;
