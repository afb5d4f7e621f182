//! Error types for the signal graph

use thiserror::Error;

use crate::CellId;

/// Core graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Refresh reached a cell that has no compute function attached yet
    #[error("Cell {name} has no compute function")]
    MissingFunction { name: String },

    /// Handle points at a cell that was removed (or never existed)
    #[error("Dangling cell reference: {0:?}")]
    DanglingDependency(CellId),

    /// Refresh re-entered a cell that is already being refreshed
    #[error("Dependency cycle detected at cell {name}")]
    CycleDetected { name: String },

    #[error("Cell {name} does not hold a value of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    /// Failure reported by a user compute function
    #[error("Compute failed in {name}: {message}")]
    Compute { name: String, message: String },

    #[error("Formatting failed")]
    Format(#[from] std::fmt::Error),
}

impl GraphError {
    /// Build a compute failure for the named cell
    pub fn compute(name: impl Into<String>, message: impl ToString) -> Self {
        GraphError::Compute {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
