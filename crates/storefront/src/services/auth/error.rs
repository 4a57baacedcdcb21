//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] template_shop_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The account exists but its email address is not confirmed yet.
    #[error("email address not confirmed")]
    EmailNotConfirmed,

    /// The refresh token was rejected; the user must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// The auth service returned a user without a usable email.
    #[error("auth service returned an incomplete user")]
    IncompleteUser,

    /// Backend error not covered above.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
