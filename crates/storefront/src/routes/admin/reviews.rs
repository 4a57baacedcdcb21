//! Review moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use template_shop_core::{Review, ReviewId};

use crate::db::ReviewRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::{PageQuery, path_id};
use crate::state::AppState;

/// All reviews, newest first.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Vec<Review>>> {
    let reviews = ReviewRepository::new(state.backend(), admin.caller())
        .list(paging.page(), paging.per_page())
        .await?;
    Ok(Json(reviews))
}

/// Delete a review.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: ReviewId = path_id(&id, "Review")?;
    ReviewRepository::new(state.backend(), admin.caller())
        .delete(id)
        .await?;

    tracing::info!(review_id = %id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
