//! Account route handlers.
//!
//! All handlers require a signed-in user and act with the user's own token,
//! so the backend only ever returns the user's own rows.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{DownloadRecord, Order, ProfilePatch, UserProfile};

use crate::db::{DownloadRepository, OrderRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::validation;
use crate::state::AppState;

/// Profile update form.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Own profile.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    let profile = ProfileRepository::new(state.backend(), user.caller())
        .get(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

/// Update own name and avatar.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<UserProfile>> {
    let patch = validation::profile(request.full_name.as_deref(), request.avatar_url.as_deref())?;
    let profiles = ProfileRepository::new(state.backend(), user.caller());

    // Nothing to write: answer with the stored profile.
    let profile = if patch == ProfilePatch::default() {
        profiles.get(user.id).await?
    } else {
        Some(profiles.update(user.id, &patch).await?)
    };
    let profile = profile.ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

/// Order history with items, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.backend(), user.caller())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Download history, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn downloads(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<DownloadRecord>>> {
    let history = DownloadRepository::new(state.backend(), user.caller())
        .list_for_user(user.id)
        .await?;
    Ok(Json(history))
}
