//! Category administration.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{Category, CategoryId, CategoryPatch, is_valid_slug};

use crate::db::CategoryRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::path_id;
use crate::services::validation::{self, MAX_CONTACT_MESSAGE, MAX_SHORT_TEXT, ValidationError};
use crate::state::AppState;

/// Category form. On update, omitted fields stay as they are.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// All categories.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.backend(), admin.caller())
        .list()
        .await?;
    Ok(Json(categories))
}

/// Create a category. The slug is derived from the name when omitted.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse> {
    let category = validation::category(
        request.name.as_deref().unwrap_or_default(),
        request.slug.as_deref(),
        request.description.as_deref(),
    )?;
    let category = CategoryRepository::new(state.backend(), admin.caller())
        .create(&category)
        .await?;
    state.catalog().invalidate_all().await;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Update a category.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let id: CategoryId = path_id(&id, "Category")?;
    let patch = category_patch(&request)?;
    let category = CategoryRepository::new(state.backend(), admin.caller())
        .update(id, &patch)
        .await?;
    state.catalog().invalidate_all().await;
    Ok(Json(category))
}

/// Delete a category. Its products stay, without a category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: CategoryId = path_id(&id, "Category")?;
    CategoryRepository::new(state.backend(), admin.caller())
        .delete(id)
        .await?;
    state.catalog().invalidate_all().await;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn category_patch(request: &CategoryRequest) -> std::result::Result<CategoryPatch, ValidationError> {
    let name = match request.name.as_deref() {
        Some(name) => Some(validation::required_text("name", name, MAX_SHORT_TEXT)?),
        None => None,
    };
    let slug = match request.slug.as_deref().map(str::trim) {
        Some(slug) if is_valid_slug(slug) => Some(slug.to_string()),
        Some(slug) => return Err(ValidationError::InvalidSlug(slug.to_string())),
        None => None,
    };
    let description =
        validation::optional_text("description", request.description.as_deref(), MAX_CONTACT_MESSAGE)?;
    Ok(CategoryPatch {
        name,
        slug,
        description,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, slug: Option<&str>) -> CategoryRequest {
        CategoryRequest {
            name: name.map(String::from),
            slug: slug.map(String::from),
            description: None,
        }
    }

    #[test]
    fn test_patch_keeps_omitted_fields() {
        let patch = category_patch(&request(None, None)).unwrap();
        assert_eq!(patch, CategoryPatch::default());
    }

    #[test]
    fn test_patch_validates_given_fields() {
        let patch = category_patch(&request(Some(" Resumes "), Some("resumes"))).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Resumes"));
        assert_eq!(patch.slug.as_deref(), Some("resumes"));

        assert_eq!(
            category_patch(&request(Some("  "), None)).unwrap_err(),
            ValidationError::Required("name")
        );
        assert!(matches!(
            category_patch(&request(None, Some("Bad Slug"))).unwrap_err(),
            ValidationError::InvalidSlug(_)
        ));
    }
}
