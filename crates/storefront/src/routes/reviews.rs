//! Product review handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{NewReview, ProductId, Review};

use super::path_id;
use crate::backend::Caller;
use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::validation;
use crate::state::AppState;

/// Review form.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Reviews of a product, newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Path(product): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let product_id: ProductId = path_id(&product, "Product")?;
    let reviews = ReviewRepository::new(state.backend(), Caller::Anon)
        .list_for_product(product_id)
        .await?;
    Ok(Json(reviews))
}

/// Review a product. One review per user and product.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse> {
    let product_id: ProductId = path_id(&product, "Product")?;
    let input = validation::review(request.rating, request.comment.as_deref())?;

    let exists = ProductRepository::new(state.backend(), user.caller())
        .get(product_id)
        .await?
        .is_some_and(|p| p.is_active);
    if !exists {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let review = NewReview {
        product_id,
        user_id: user.id,
        rating: input.rating,
        comment: input.comment,
    };
    let review = ReviewRepository::new(state.backend(), user.caller())
        .create(&review)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("You have already reviewed this product".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(review_id = %review.id, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}
