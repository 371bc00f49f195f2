//! Account and credential errors.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from registration, login, profile edits and back-office user
/// management.
#[derive(Debug, Error)]
pub enum AuthError {
    // Input
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] emporium_core::EmailError),

    #[error("invalid password: {0}")]
    WeakPassword(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    /// An admin tried to demote, deactivate or delete their own account.
    #[error("{0}")]
    SelfModification(&'static str),

    // Lookup
    /// Wrong password, unknown email or an inactive account. Callers cannot
    /// tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("email already registered")]
    UserAlreadyExists,

    // Infrastructure
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
