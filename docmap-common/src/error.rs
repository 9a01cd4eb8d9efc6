//! Common error types for docmap

use thiserror::Error;

/// Common result type for docmap storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the docmap storage crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record rejected before any write was attempted
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
