//! HTTP route handlers for storefront.
//!
//! Every endpoint speaks JSON. Errors are `{"error": "<message>"}`.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness check
//! GET    /health/ready                   - Readiness check (backend reachable)
//!
//! # Catalog
//! GET    /api/categories                 - Category list
//! GET    /api/products                   - Product listing (filter, search, sort, page)
//! GET    /api/products/:slug             - Product detail
//! GET    /api/products/:id/reviews       - Reviews for a product
//! POST   /api/products/:id/reviews       - Review a product (requires auth)
//!
//! # Cart (session)
//! GET    /api/cart                       - Cart contents and total
//! POST   /api/cart/items                 - Add a product
//! DELETE /api/cart/items/:id             - Remove a product
//! DELETE /api/cart                       - Empty the cart
//!
//! # Purchases (requires auth)
//! POST   /api/checkout                   - Turn the cart into an order
//! GET    /api/downloads/:id              - Signed download link
//!
//! # Account (requires auth)
//! GET    /api/account/profile            - Own profile
//! PUT    /api/account/profile            - Update own profile
//! GET    /api/account/orders             - Order history
//! GET    /api/account/downloads          - Download history
//!
//! # Auth
//! POST   /api/auth/signup                - Register (rate limited)
//! POST   /api/auth/signin                - Sign in (rate limited)
//! POST   /api/auth/signout               - Sign out
//! GET    /api/auth/session               - Current user and admin status
//! GET    /api/auth/admin-status          - Admin status only
//!
//! # Contact
//! POST   /api/contact                    - Contact form (rate limited)
//!
//! # Admin (requires admin), see [`admin`]
//! /api/admin/...
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod downloads;
pub mod health;
pub mod reviews;

use axum::{
    Router,
    routing::{delete, get, post},
};
use serde::Deserialize;

use template_shop_core::parse_id;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, contact_rate_limiter};
use crate::state::AppState;

/// Default page size for back-office listings.
const DEFAULT_PER_PAGE: u32 = 25;
/// Largest page size for back-office listings.
const MAX_PER_PAGE: u32 = 100;

/// Page query parameters for list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to a sane range.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// Parse a path ID, answering 404 for anything that is not a UUID.
///
/// # Errors
///
/// Returns `AppError::NotFound` when `raw` does not parse.
pub fn path_id<T: From<uuid::Uuid>>(raw: &str, what: &str) -> Result<T, AppError> {
    parse_id(raw).ok_or_else(|| AppError::NotFound(format!("{what} not found")))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{product}", get(catalog::product))
        .route(
            "/products/{product}/reviews",
            get(reviews::list).post(reviews::create),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{product_id}", delete(cart::remove))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).put(account::update_profile),
        )
        .route("/orders", get(account::orders))
        .route("/downloads", get(account::downloads))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/signout", post(auth::signout))
        .route("/session", get(auth::session))
        .route("/admin-status", get(auth::admin_status))
        .merge(limited)
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .route("/downloads/{product_id}", get(downloads::download))
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .route(
            "/contact",
            post(contact::submit).layer(contact_rate_limiter()),
        )
        .nest("/admin", admin::routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use template_shop_core::ProductId;

    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamps() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);

        let query = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_path_id() {
        let id = ProductId::random();
        let parsed: ProductId = path_id(&id.to_string(), "Product").unwrap();
        assert_eq!(parsed, id);

        let err = path_id::<ProductId>("not-a-uuid", "Product").err();
        assert!(matches!(err, Some(AppError::NotFound(_))));
    }
}
