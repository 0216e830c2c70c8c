//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::FieldErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signup or admin-creation fields failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Invalid credentials (wrong password, unknown name, or no credential on file).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Name already registered (case-insensitively).
    #[error("user already exists")]
    UserAlreadyExists,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
