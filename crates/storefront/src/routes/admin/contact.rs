//! Contact submission inbox.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{ContactStatus, ContactSubmission, ContactSubmissionId};

use crate::db::ContactRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::{PageQuery, path_id};
use crate::state::AppState;

/// Inbox query.
#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    pub status: Option<ContactStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ContactStatus,
}

/// Submissions, newest first.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Vec<ContactSubmission>>> {
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let submissions = ContactRepository::new(state.backend(), admin.caller())
        .list(query.status, paging.page(), paging.per_page())
        .await?;
    Ok(Json(submissions))
}

/// Mark a submission read, replied or archived.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<ContactSubmission>> {
    let id: ContactSubmissionId = path_id(&id, "Submission")?;
    let submission = ContactRepository::new(state.backend(), admin.caller())
        .set_status(id, request.status)
        .await?;
    Ok(Json(submission))
}

/// Delete a submission.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: ContactSubmissionId = path_id(&id, "Submission")?;
    ContactRepository::new(state.backend(), admin.caller())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
