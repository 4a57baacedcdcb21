//! Back-office route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin) and
//! acts with the administrator's own token, so the backend's row-level
//! security still applies.
//!
//! # Route Structure
//!
//! ```text
//! GET    /stats                  - Dashboard counts and revenue
//!
//! GET    /categories             - Category list
//! POST   /categories             - Create category
//! PUT    /categories/:id         - Update category
//! DELETE /categories/:id         - Delete category
//!
//! GET    /products               - Product list (inactive included)
//! POST   /products               - Create product
//! GET    /products/:id           - Product detail
//! PUT    /products/:id           - Update product
//! DELETE /products/:id           - Delete product and its stored files
//! POST   /products/:id/file      - Upload template archive (multipart)
//! POST   /products/:id/image     - Upload cover image (multipart)
//!
//! GET    /orders                 - Order list (?status=)
//! GET    /orders/:id             - Order detail with items
//! PUT    /orders/:id/status      - Change order status
//!
//! GET    /users                  - Profile list
//! PUT    /users/:id/role         - Change a user's role
//!
//! GET    /reviews                - Review list
//! DELETE /reviews/:id            - Delete review
//!
//! GET    /contact                - Contact submissions (?status=)
//! PUT    /contact/:id/status     - Change submission status
//! DELETE /contact/:id            - Delete submission
//! ```

pub mod categories;
pub mod contact;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/products/{id}/file",
            post(products::upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/products/{id}/image",
            post(products::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/users", get(users::list))
        .route("/users/{id}/role", put(users::set_role))
        .route("/reviews", get(reviews::list))
        .route("/reviews/{id}", delete(reviews::delete))
        .route("/contact", get(contact::list))
        .route("/contact/{id}/status", put(contact::update_status))
        .route("/contact/{id}", delete(contact::delete))
}
