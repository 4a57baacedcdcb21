//! Authentication extractors and route guards.
//!
//! - [`OptionalAuth`] yields the signed-in user, if any.
//! - [`RequireAuth`] rejects signed-out visitors with 401 and refreshes an
//!   expired access token on the way through.
//! - [`RequireAdmin`] additionally resolves the admin status: 403 for
//!   non-admins, 503 when the status could not be determined.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tower_sessions::Session;
use tracing::warn;

use crate::db::ProfileRepository;
use crate::error::set_sentry_user;
use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::services::{AdminStatus, AuthError, AuthService};
use crate::state::AppState;

/// Error returned when a route guard rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not signed in, or the session could not be refreshed.
    Unauthorized,
    /// Signed in but not an administrator.
    Forbidden,
    /// Authorization could not be determined right now.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Administrator access required"),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not verify permissions, please try again",
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Map a resolved admin status to a guard decision.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins and `Unavailable` when the status is
/// unknown.
pub const fn admin_decision(status: AdminStatus) -> Result<(), AuthRejection> {
    match status {
        AdminStatus::Admin => Ok(()),
        AdminStatus::NotAdmin => Err(AuthRejection::Forbidden),
        AdminStatus::Error | AdminStatus::Loading => Err(AuthRejection::Unavailable),
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not
/// signed in. An expired token is refreshed; if that fails the visitor is
/// treated as signed out.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.email),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts, state).await.ok()))
    }
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = session_user(parts, state).await?;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(Self(user))
    }
}

/// Extractor that requires a signed-in administrator.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        admin_decision(admin_status(state, Some(&user)).await)?;
        Ok(Self(user))
    }
}

/// Resolve the admin status of `user` through the shared cache.
///
/// Signed-out visitors are never admins.
pub async fn admin_status(state: &AppState, user: Option<&CurrentUser>) -> AdminStatus {
    let Some(user) = user else {
        return AdminStatus::NotAdmin;
    };
    let profiles = ProfileRepository::new(state.backend(), user.caller());
    state
        .admin_cache()
        .resolve(Some(user.id), || profiles.role(user.id))
        .await
}

/// The signed-in user, with an expired access token already refreshed.
async fn session_user(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)?;

    let user = current_user(&session)
        .await
        .ok_or(AuthRejection::Unauthorized)?;

    if user.is_expired(Utc::now()) {
        refresh(&session, state, &user).await
    } else {
        Ok(user)
    }
}

/// Exchange an expired access token, storing the new one in the session.
async fn refresh(
    session: &Session,
    state: &AppState,
    user: &CurrentUser,
) -> Result<CurrentUser, AuthRejection> {
    let auth = AuthService::new(state.backend(), state.admin_cache());
    match auth.refresh(user).await {
        Ok(refreshed) => {
            set_current_user(session, &refreshed).await.map_err(|e| {
                warn!(error = %e, "Failed to store refreshed session");
                AuthRejection::Unavailable
            })?;
            Ok(refreshed)
        }
        Err(AuthError::SessionExpired) => {
            if let Err(e) = clear_current_user(session).await {
                warn!(error = %e, "Failed to clear expired session");
            }
            Err(AuthRejection::Unauthorized)
        }
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Token refresh failed");
            Err(AuthRejection::Unavailable)
        }
    }
}

/// The user stored in the session, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_decision() {
        assert_eq!(admin_decision(AdminStatus::Admin), Ok(()));
        assert_eq!(
            admin_decision(AdminStatus::NotAdmin),
            Err(AuthRejection::Forbidden)
        );
        assert_eq!(
            admin_decision(AdminStatus::Error),
            Err(AuthRejection::Unavailable)
        );
        assert_eq!(
            admin_decision(AdminStatus::Loading),
            Err(AuthRejection::Unavailable)
        );
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthRejection::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
