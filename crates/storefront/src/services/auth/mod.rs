//! Authentication service.
//!
//! Email and password accounts live in the backend's auth service; this
//! module validates input, translates its errors and keeps the admin-status
//! cache in step with sign-in, refresh and sign-out.

mod error;

pub use error::AuthError;

use chrono::Utc;
use tracing::{info, instrument, warn};

use template_shop_core::Email;

use crate::backend::{BackendClient, BackendError, SignUpOutcome};
use crate::models::CurrentUser;
use crate::services::admin_status::AdminStatusCache;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Result of a registration.
#[derive(Debug)]
pub enum Registration {
    /// The user is signed in right away.
    SignedIn(CurrentUser),
    /// A confirmation email was sent; the user signs in after confirming.
    ConfirmationRequired { email: Email },
}

/// Authentication service.
pub struct AuthService<'a> {
    client: &'a BackendClient,
    admin_cache: &'a AdminStatusCache,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(client: &'a BackendClient, admin_cache: &'a AdminStatusCache) -> Self {
        Self {
            client,
            admin_cache,
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Registration, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        let outcome = self
            .client
            .sign_up(email.as_str(), password, full_name)
            .await
            .map_err(map_sign_up_error)?;

        match outcome {
            SignUpOutcome::SignedIn(session) => {
                let user = CurrentUser::from_auth_session(&session, Utc::now())
                    .ok_or(AuthError::IncompleteUser)?;
                info!(user_id = %user.id, "User registered and signed in");
                Ok(Registration::SignedIn(user))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                info!(user_id = %user.id, "User registered, confirmation pending");
                Ok(Registration::ConfirmationRequired { email })
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// Drops any cached admin status for the user so it is re-read with the
    /// new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email or password is wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let session = self
            .client
            .sign_in_with_password(email.as_str(), password)
            .await
            .map_err(map_sign_in_error)?;

        let user = CurrentUser::from_auth_session(&session, Utc::now())
            .ok_or(AuthError::IncompleteUser)?;
        self.admin_cache.invalidate(user.id).await;
        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Exchange the user's refresh token for fresh tokens.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the refresh token is rejected.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn refresh(&self, user: &CurrentUser) -> Result<CurrentUser, AuthError> {
        let session = self
            .client
            .refresh_session(&user.refresh_token)
            .await
            .map_err(|e| match e {
                BackendError::Api { status, .. } if (400..500).contains(&status) => {
                    AuthError::SessionExpired
                }
                other => AuthError::Backend(other),
            })?;

        let refreshed = CurrentUser::from_auth_session(&session, Utc::now())
            .ok_or(AuthError::IncompleteUser)?;
        self.admin_cache.invalidate(refreshed.id).await;
        Ok(refreshed)
    }

    /// Sign out: revoke the tokens and forget the cached admin status.
    ///
    /// A failed revocation is logged and otherwise ignored; the local session
    /// is cleared by the caller either way.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sign_out(&self, user: &CurrentUser) {
        self.admin_cache.invalidate(user.id).await;
        if let Err(e) = self.client.sign_out(&user.access_token).await {
            warn!(error = %e, "Failed to revoke session in auth service");
        }
        info!("User signed out");
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn map_sign_up_error(err: BackendError) -> AuthError {
    let code = err.code().map(str::to_owned);
    match code.as_deref() {
        Some("user_already_exists" | "email_exists") => AuthError::UserAlreadyExists,
        Some("weak_password") => AuthError::WeakPassword(match &err {
            BackendError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }),
        _ if err.status() == Some(422) && err.to_string().contains("already registered") => {
            AuthError::UserAlreadyExists
        }
        _ => AuthError::Backend(err),
    }
}

fn map_sign_in_error(err: BackendError) -> AuthError {
    let code = err.code().map(str::to_owned);
    match code.as_deref() {
        Some("invalid_credentials" | "invalid_grant") => AuthError::InvalidCredentials,
        Some("email_not_confirmed") => AuthError::EmailNotConfirmed,
        _ if err.status() == Some(400) => AuthError::InvalidCredentials,
        _ => AuthError::Backend(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<&str>, message: &str) -> BackendError {
        BackendError::Api {
            status,
            code: code.map(String::from),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_password_length_counts_characters() {
        // Seven characters, more than eight bytes.
        assert!(validate_password("ééééééé").is_err());
    }

    #[test]
    fn test_sign_up_errors() {
        assert!(matches!(
            map_sign_up_error(api(422, Some("user_already_exists"), "User already registered")),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            map_sign_up_error(api(422, None, "User already registered")),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            map_sign_up_error(api(422, Some("weak_password"), "Password is too weak")),
            AuthError::WeakPassword(ref m) if m == "Password is too weak"
        ));
        assert!(matches!(
            map_sign_up_error(api(500, None, "boom")),
            AuthError::Backend(_)
        ));
    }

    #[test]
    fn test_sign_in_errors() {
        assert!(matches!(
            map_sign_in_error(api(400, Some("invalid_credentials"), "Invalid login credentials")),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_sign_in_error(api(400, Some("email_not_confirmed"), "Email not confirmed")),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            map_sign_in_error(api(503, None, "unavailable")),
            AuthError::Backend(_)
        ));
    }
}
