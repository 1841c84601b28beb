//! Common error types for the run club service

use thiserror::Error;

/// Common result type for run club operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by storage and directory operations
///
/// Scan outcomes (rejections, unknown runners) are not errors; see
/// [`crate::scan::ScanOutcome`].
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

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (corrupt rows, failed migrations)
    #[error("Internal error: {0}")]
    Internal(String),
}
