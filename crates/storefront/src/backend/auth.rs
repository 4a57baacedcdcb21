//! Authentication calls against the backend's auth surface.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use template_shop_core::UserId;

use super::{BackendClient, BackendError, Caller};

/// A user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Tokens issued by a successful sign-in or refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry (unix seconds), when the service reports it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// When the access token stops being accepted.
    ///
    /// Uses the reported absolute expiry when present, otherwise `issued_at`
    /// plus the token lifetime.
    #[must_use]
    pub fn expiry(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| issued_at + Duration::seconds(self.expires_in))
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in.
    SignedIn(AuthSession),
    /// The user must confirm their email before signing in.
    ConfirmationRequired(AuthUser),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl BackendClient {
    /// Register a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth service rejects the registration.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.url("/auth/v1/signup")?;
        let body = SignUpRequest {
            email,
            password,
            data: SignUpMetadata { full_name },
        };
        let request = self.request(Method::POST, url, Caller::Anon)?.json(&body);
        let response = self.send(request).await?;
        let value: serde_json::Value = Self::parse_json(response).await?;

        if value.get("access_token").is_some() {
            Ok(SignUpOutcome::SignedIn(serde_json::from_value(value)?))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(serde_json::from_value(
                value,
            )?))
        }
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let url = self.url("/auth/v1/token?grant_type=password")?;
        let request = self
            .request(Method::POST, url, Caller::Anon)?
            .json(&PasswordCredentials { email, password });
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is expired or revoked.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let url = self.url("/auth/v1/token?grant_type=refresh_token")?;
        let request = self
            .request(Method::POST, url, Caller::Anon)?
            .json(&RefreshRequest { refresh_token });
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth service rejects the request.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.url("/auth/v1/logout")?;
        self.send(self.request(Method::POST, url, Caller::User(access_token))?)
            .await?;
        Ok(())
    }

    /// Look up the user behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let url = self.url("/auth/v1/user")?;
        let response = self
            .send(self.request(Method::GET, url, Caller::User(access_token))?)
            .await?;
        Self::parse_json(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SESSION_JSON: &str = r#"{
        "access_token": "eyJhbGciOi.access",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1719849600,
        "refresh_token": "refresh-abc",
        "user": {"id": "0c7f4e0a-2a52-4c47-8a5e-6b2f7a1b9c33", "email": "buyer@example.com"}
    }"#;

    #[test]
    fn test_session_parses() {
        let session: AuthSession = serde_json::from_str(SESSION_JSON).unwrap();
        assert_eq!(session.user.email.as_deref(), Some("buyer@example.com"));
        assert_eq!(session.expires_in, 3600);
    }

    #[test]
    fn test_session_expiry_prefers_absolute() {
        let session: AuthSession = serde_json::from_str(SESSION_JSON).unwrap();
        let expiry = session.expiry(Utc::now());
        assert_eq!(expiry.timestamp(), 1_719_849_600);
    }

    #[test]
    fn test_session_expiry_from_lifetime() {
        let mut session: AuthSession = serde_json::from_str(SESSION_JSON).unwrap();
        session.expires_at = None;
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(session.expiry(issued).timestamp(), 1_700_003_600);
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let session: AuthSession = serde_json::from_str(SESSION_JSON).unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("refresh-abc"));
        assert!(!debug.contains("eyJhbGciOi"));
        assert!(debug.contains("[REDACTED]"));
    }
}
