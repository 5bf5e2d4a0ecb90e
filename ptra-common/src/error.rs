//! Common error types for PTRA

use thiserror::Error;

/// Common result type for PTRA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the PTRA crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing failure
    #[error("Password hashing error: {0}")]
    Password(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
