//! User administration.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{UserId, UserProfile, UserRole};

use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::{PageQuery, path_id};
use crate::state::AppState;

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

/// User profiles, newest first.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let profiles = ProfileRepository::new(state.backend(), admin.caller())
        .list(paging.page(), paging.per_page())
        .await?;
    Ok(Json(profiles))
}

/// Change a user's role and forget their cached admin status.
///
/// Administrators cannot change their own role, so the last admin cannot
/// lock everyone out by accident.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<UserProfile>> {
    let id: UserId = path_id(&id, "User")?;
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    let profile = ProfileRepository::new(state.backend(), admin.caller())
        .set_role(id, request.role)
        .await?;
    state.admin_cache().invalidate(id).await;

    tracing::info!(user_id = %id, role = %request.role, "User role changed");
    Ok(Json(profile))
}
