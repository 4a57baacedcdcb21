//! Authentication route handlers.
//!
//! Tokens never leave the server: they are kept in the session and clients
//! only see the user and the admin status.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use template_shop_core::{Email, UserId};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, admin_status as resolve_admin_status, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::Registration;
use crate::services::{AdminStatus, AuthService};
use crate::state::AppState;

/// Sign-up form.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Sign-in form.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Public view of the signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&CurrentUser> for SessionUser {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Who is signed in and whether they are an administrator.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: Option<SessionUser>,
    pub admin_status: AdminStatus,
}

/// Admin status alone.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdminStatusResponse {
    pub status: AdminStatus,
    pub is_admin: bool,
}

/// Register with email and password.
///
/// Answers 201 with the session when the account is usable at once, or 202
/// when the email address must be confirmed first.
#[instrument(skip(state, session, request))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SignUpRequest>,
) -> Result<Response> {
    let auth = AuthService::new(state.backend(), state.admin_cache());
    let registration = auth
        .register(
            &request.email,
            &request.password,
            request.full_name.as_deref(),
        )
        .await?;

    match registration {
        Registration::SignedIn(user) => {
            let body = start_session(&state, &session, &user).await?;
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        Registration::ConfirmationRequired { email } => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "status": "confirmation_required",
                "email": email,
            })),
        )
            .into_response()),
    }
}

/// Sign in with email and password.
#[instrument(skip(state, session, request))]
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>> {
    let auth = AuthService::new(state.backend(), state.admin_cache());
    let user = auth.sign_in(&request.email, &request.password).await?;
    Ok(Json(start_session(&state, &session, &user).await?))
}

/// Sign out and drop the whole session, cart included.
#[instrument(skip(state, user, session))]
pub async fn signout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<StatusCode> {
    if let Some(user) = user {
        AuthService::new(state.backend(), state.admin_cache())
            .sign_out(&user)
            .await;
    }
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, if any, and their admin status.
#[instrument(skip(state, user))]
pub async fn session(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Json<SessionResponse> {
    let admin_status = resolve_admin_status(&state, user.as_ref()).await;
    Json(SessionResponse {
        user: user.as_ref().map(SessionUser::from),
        admin_status,
    })
}

/// Admin status of the signed-in user. Signed-out visitors are not admins.
#[instrument(skip(state, user))]
pub async fn admin_status(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Json<AdminStatusResponse> {
    let status = resolve_admin_status(&state, user.as_ref()).await;
    Json(AdminStatusResponse {
        status,
        is_admin: status.is_admin(),
    })
}

/// Store a freshly signed-in user under a new session id.
async fn start_session(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<SessionResponse> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(SessionResponse {
        user: Some(SessionUser::from(user)),
        admin_status: resolve_admin_status(state, Some(user)).await,
    })
}
