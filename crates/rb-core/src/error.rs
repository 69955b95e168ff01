//! # AppError
//!
//! Centralized error handling for the Rusty-Blog crates.
//! Plugins map their driver errors into these variants at the port boundary.

use thiserror::Error;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required field was missing or empty
    #[error("validation error: {0}")]
    Validation(String),

    /// Credentials rejected or no signed-in user
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., store unreachable, hashing worker died)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for Rusty-Blog logic.
pub type Result<T> = std::result::Result<T, AppError>;
