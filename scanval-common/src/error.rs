//! Common error types for scanval

use thiserror::Error;

/// Common result type for scanval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across scanval crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential could not be obtained or refreshed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
