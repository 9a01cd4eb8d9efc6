use thiserror::Error;

/// Errors returned by layout operations.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("dimension mismatch for '{id}': expected {expected}, got {got}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        got: usize,
    },

    #[error("embedding for '{id}' is empty")]
    EmptyVector { id: String },

    #[error("embedding for '{id}' contains a non-finite value")]
    NonFiniteValue { id: String },
}
