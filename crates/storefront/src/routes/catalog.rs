//! Public catalog handlers: categories, product listings and product pages.
//!
//! Reads go through the catalog cache. Searches skip it.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use tracing::instrument;

use template_shop_core::Product;

use crate::backend::Caller;
use crate::db::{CategoryRepository, ProductFilter, ProductPage, ProductRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Browsers and CDNs may reuse catalog answers briefly.
const CATALOG_CACHE_CONTROL: &str = "public, max-age=60";

/// List all categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = match state.catalog().categories().await {
        Some(categories) => categories,
        None => {
            let categories = CategoryRepository::new(state.backend(), Caller::Anon)
                .list()
                .await?;
            state.catalog().insert_categories(categories.clone()).await;
            categories
        }
    };
    Ok(cacheable(categories))
}

/// List active products.
///
/// Query parameters: `category` (slug), `q` (title search), `featured`,
/// `sort` (`newest`, `price_asc`, `price_desc`, `popular`), `page`, `per_page`.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(mut filter): Query<ProductFilter>,
) -> Result<impl IntoResponse> {
    filter.include_inactive = false;

    if !filter.is_cacheable() {
        let page = list_products(&state, &filter).await?;
        return Ok(Json(page).into_response());
    }

    let key = filter.cache_key();
    let page = match state.catalog().products(&key).await {
        Some(page) => page,
        None => {
            let page = list_products(&state, &filter).await?;
            state.catalog().insert_products(key, page.clone()).await;
            page
        }
    };
    Ok(cacheable(page).into_response())
}

/// Show an active product by slug.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    if let Some(product) = state.catalog().product(&slug).await {
        return Ok(cacheable(product));
    }

    let product: Product = ProductRepository::new(state.backend(), Caller::Anon)
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    state.catalog().insert_product(product.clone()).await;
    Ok(cacheable(product))
}

async fn list_products(state: &AppState, filter: &ProductFilter) -> Result<ProductPage> {
    Ok(ProductRepository::new(state.backend(), Caller::Anon)
        .list(filter)
        .await?)
}

fn cacheable<T: serde::Serialize>(body: T) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, CATALOG_CACHE_CONTROL)], Json(body))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use template_shop_core::Category;

    use super::*;

    #[test]
    fn test_cacheable_sets_cache_control() {
        let response = cacheable(Vec::<Category>::new()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            CATALOG_CACHE_CONTROL
        );
    }
}
