//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (when `CORS_ALLOWED_ORIGIN` is set)
//! 5. Security headers (and HSTS over HTTPS)
//! 6. Session layer (tower-sessions, in-memory store)
//! 7. Rate limiting (governor) on auth and contact routes
//!
//! Route guards are extractors, see [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, admin_status, clear_current_user, set_current_user,
};
pub use rate_limit::{auth_rate_limiter, contact_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::{hsts_middleware, security_headers_middleware};
pub use session::create_session_layer;
