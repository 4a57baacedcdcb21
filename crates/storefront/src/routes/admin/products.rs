//! Product administration, including file and image uploads.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{instrument, warn};

use template_shop_core::{
    CategoryId, NewProduct, Product, ProductId, ProductPatch, is_valid_slug,
};

use crate::backend::{BackendClient, Caller, object_path_from_public_url};
use crate::db::{ProductFilter, ProductPage, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::path_id;
use crate::services::validation::{self, MAX_CONTACT_MESSAGE, MAX_SHORT_TEXT, ValidationError};
use crate::state::AppState;

/// Image types accepted for product covers.
const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Product creation form.
#[derive(Debug, Deserialize)]
pub struct NewProductRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: bool,
}

/// Product update form. Omitted fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
}

/// All products, inactive ones included.
#[instrument(skip(state, admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(mut filter): Query<ProductFilter>,
) -> Result<Json<ProductPage>> {
    filter.include_inactive = true;
    let page = ProductRepository::new(state.backend(), admin.caller())
        .list(&filter)
        .await?;
    Ok(Json(page))
}

/// One product, active or not.
#[instrument(skip(state, admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id: ProductId = path_id(&id, "Product")?;
    let product = find(state.backend(), admin.caller(), id).await?;
    Ok(Json(product))
}

/// Create a product. Files are attached afterwards with the upload endpoints.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<NewProductRequest>,
) -> Result<impl IntoResponse> {
    let product = new_product(&request)?;
    let product = ProductRepository::new(state.backend(), admin.caller())
        .create(&product)
        .await?;
    state.catalog().invalidate_all().await;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let id: ProductId = path_id(&id, "Product")?;
    let patch = product_patch(&request)?;
    let product = ProductRepository::new(state.backend(), admin.caller())
        .update(id, &patch)
        .await?;
    state.catalog().invalidate_all().await;
    Ok(Json(product))
}

/// Delete a product, then its template file and cover image.
///
/// Files are removed after the row so a product never points at a missing
/// file. Removal failures are logged and leave orphaned objects behind.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: ProductId = path_id(&id, "Product")?;
    let backend = state.backend();
    let storage = &state.config().storage;
    let product = find(backend, admin.caller(), id).await?;

    ProductRepository::new(backend, admin.caller())
        .delete(id)
        .await?;
    state.catalog().invalidate_all().await;

    if let Some(path) = product.file_path.as_deref() {
        remove_object(backend, admin.caller(), &storage.templates_bucket, path).await;
    }
    if let Some(path) = product.image_url.as_deref().and_then(|url| {
        object_path_from_public_url(backend.base_url(), &storage.images_bucket, url)
    }) {
        remove_object(backend, admin.caller(), &storage.images_bucket, path).await;
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Upload the downloadable template archive (multipart field `file`).
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_file(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let id: ProductId = path_id(&id, "Product")?;
    let backend = state.backend();
    let bucket = &state.config().storage.templates_bucket;
    let product = find(backend, admin.caller(), id).await?;

    let upload = read_upload(multipart).await?;
    let path = object_path(id, &upload.file_name);
    backend
        .upload(
            admin.caller(),
            bucket,
            &path,
            &upload.content_type,
            upload.bytes,
        )
        .await?;

    let patch = ProductPatch {
        file_path: Some(path.clone()),
        ..ProductPatch::default()
    };
    let updated = ProductRepository::new(backend, admin.caller())
        .update(id, &patch)
        .await?;
    state.catalog().invalidate_all().await;

    if let Some(old) = product.file_path.as_deref().filter(|old| *old != path) {
        remove_object(backend, admin.caller(), bucket, old).await;
    }

    tracing::info!(product_id = %id, path = %path, "Template file uploaded");
    Ok(Json(updated))
}

/// Upload the cover image (multipart field `file`) and publish its URL.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let id: ProductId = path_id(&id, "Product")?;
    let backend = state.backend();
    let bucket = &state.config().storage.images_bucket;
    let product = find(backend, admin.caller(), id).await?;

    let upload = read_upload(multipart).await?;
    if !IMAGE_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type: {}",
            upload.content_type
        )));
    }
    let path = object_path(id, &upload.file_name);
    backend
        .upload(
            admin.caller(),
            bucket,
            &path,
            &upload.content_type,
            upload.bytes,
        )
        .await?;

    let patch = ProductPatch {
        image_url: Some(backend.public_url(bucket, &path)),
        ..ProductPatch::default()
    };
    let updated = ProductRepository::new(backend, admin.caller())
        .update(id, &patch)
        .await?;
    state.catalog().invalidate_all().await;

    let old = product
        .image_url
        .as_deref()
        .and_then(|url| object_path_from_public_url(backend.base_url(), bucket, url))
        .filter(|old| *old != path);
    if let Some(old) = old {
        remove_object(backend, admin.caller(), bucket, old).await;
    }

    tracing::info!(product_id = %id, path = %path, "Product image uploaded");
    Ok(Json(updated))
}

async fn find(backend: &BackendClient, caller: Caller<'_>, id: ProductId) -> Result<Product> {
    ProductRepository::new(backend, caller)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

async fn remove_object(backend: &BackendClient, caller: Caller<'_>, bucket: &str, path: &str) {
    if let Err(e) = backend.remove(caller, bucket, &[path.to_string()]).await {
        warn!(bucket, path, error = %e, "Failed to remove stored object");
    }
}

/// A file read from a multipart form.
struct Upload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Read the `file` field of a multipart form.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::BadRequest("Missing file field".to_string()))
}

/// Storage path for an uploaded file: `<product id>/<safe file name>`.
fn object_path(id: ProductId, file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let safe = safe.trim_matches(|c| c == '.' || c == '-');
    let safe = if safe.is_empty() { "upload" } else { safe };
    format!("{id}/{safe}")
}

fn new_product(request: &NewProductRequest) -> std::result::Result<NewProduct, ValidationError> {
    let title = validation::required_text("title", &request.title, MAX_SHORT_TEXT)?;
    let slug = validation::slug_or_derived(request.slug.as_deref(), &title)?;
    Ok(NewProduct {
        category_id: request.category_id,
        description: validation::optional_text(
            "description",
            request.description.as_deref(),
            MAX_CONTACT_MESSAGE,
        )?
        .unwrap_or_default(),
        price: validation::price(request.price)?,
        preview_url: validation::optional_url("preview_url", request.preview_url.as_deref())?,
        tags: validation::tags(&request.tags)?,
        is_active: request.is_active.unwrap_or(true),
        is_featured: request.is_featured,
        title,
        slug,
    })
}

fn product_patch(
    request: &UpdateProductRequest,
) -> std::result::Result<ProductPatch, ValidationError> {
    let title = match request.title.as_deref() {
        Some(title) => Some(validation::required_text("title", title, MAX_SHORT_TEXT)?),
        None => None,
    };
    let slug = match request.slug.as_deref().map(str::trim) {
        Some(slug) if is_valid_slug(slug) => Some(slug.to_string()),
        Some(slug) => return Err(ValidationError::InvalidSlug(slug.to_string())),
        None => None,
    };
    let description = match request.description.as_deref() {
        Some(text) => Some(
            validation::optional_text("description", Some(text), MAX_CONTACT_MESSAGE)?
                .unwrap_or_default(),
        ),
        None => None,
    };
    let tags = match request.tags.as_deref() {
        Some(tags) => Some(validation::tags(tags)?),
        None => None,
    };

    Ok(ProductPatch {
        category_id: request.category_id,
        title,
        slug,
        description,
        price: request.price.map(validation::price).transpose()?,
        preview_url: validation::optional_url("preview_url", request.preview_url.as_deref())?,
        tags,
        is_active: request.is_active,
        is_featured: request.is_featured,
        ..ProductPatch::default()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn request(title: &str, price: Decimal) -> NewProductRequest {
        NewProductRequest {
            title: title.to_string(),
            slug: None,
            description: None,
            price,
            category_id: None,
            preview_url: None,
            tags: Vec::new(),
            is_active: None,
            is_featured: false,
        }
    }

    #[test]
    fn test_object_path_is_safe() {
        let id = ProductId::new(Uuid::nil());
        assert_eq!(
            object_path(id, "My Resume (v2).zip"),
            "00000000-0000-0000-0000-000000000000/My-Resume--v2-.zip"
        );
        assert_eq!(
            object_path(id, "../../etc/passwd"),
            "00000000-0000-0000-0000-000000000000/passwd"
        );
        assert_eq!(
            object_path(id, "..."),
            "00000000-0000-0000-0000-000000000000/upload"
        );
    }

    #[test]
    fn test_new_product_defaults() {
        let product = new_product(&request("Modern Resume", Decimal::new(1500, 2))).unwrap();
        assert_eq!(product.slug, "modern-resume");
        assert!(product.is_active);
        assert!(!product.is_featured);
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_new_product_rejects_bad_input() {
        assert_eq!(
            new_product(&request(" ", Decimal::ONE)).unwrap_err(),
            ValidationError::Required("title")
        );
        assert!(matches!(
            new_product(&request("Resume", Decimal::NEGATIVE_ONE)).unwrap_err(),
            ValidationError::InvalidPrice(_)
        ));
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let patch = product_patch(&UpdateProductRequest {
            price: Some(Decimal::ZERO),
            is_active: Some(false),
            ..UpdateProductRequest::default()
        })
        .unwrap();
        assert_eq!(
            patch,
            ProductPatch {
                price: Some(template_shop_core::Price::FREE),
                is_active: Some(false),
                ..ProductPatch::default()
            }
        );
    }
}
