//! Download handler.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use template_shop_core::ProductId;

use super::path_id;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::DownloadService;
use crate::services::downloads::DownloadLink;
use crate::state::AppState;

/// Issue a signed link to a product file the user may download.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn download(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<DownloadLink>> {
    let product_id: ProductId = path_id(&product_id, "Product")?;
    let config = state.config();
    let link = DownloadService::new(
        state.backend(),
        &user,
        &config.storage.templates_bucket,
        config.download_url_ttl,
    )
    .prepare(product_id)
    .await?;
    Ok(Json(link))
}
