//! # AppError
//!
//! Centralized error handling for tinyboard.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all tb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Thread)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty comment, missing image)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Persistence failure (e.g., database unavailable, constraint violated)
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),

    /// A thread listing could not be assembled
    #[error("failed to retrieve threads: {0}")]
    Retrieval(String),
}

impl AppError {
    pub fn thread_not_found(id: i64) -> Self {
        AppError::NotFound("Thread".to_string(), id.to_string())
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::NotFound(..) | AppError::ValidationError(_))
    }
}

/// A specialized Result type for tinyboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
