//! Integration tests for Template Shop.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (no backend needed)
//! cargo test -p template-shop-integration-tests
//!
//! # Tests against a running storefront and backend
//! STOREFRONT_BASE_URL=http://localhost:3000 \
//!     cargo test -p template-shop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `router` - The full middleware stack driven in-process; the backend
//!   points at a closed port so only paths that never reach it succeed
//! - `live_storefront` - HTTP tests against a running server

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::routing::post;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::Session;
use url::Url;

use template_shop_core::{Email, UserId};
use template_shop_storefront::config::{
    BackendConfig, RetrySettings, SentryConfig, StorageConfig, StorefrontConfig,
};
use template_shop_storefront::middleware::{create_session_layer, set_current_user};
use template_shop_storefront::models::CurrentUser;
use template_shop_storefront::routes;
use template_shop_storefront::state::AppState;

/// Nothing listens here; backend calls fail fast with a connection error.
pub const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:9";

/// Configuration for in-process tests: plain HTTP, no CORS, no retries.
///
/// # Panics
///
/// Never in practice; the backend URL is a constant.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            url: Url::parse(UNREACHABLE_BACKEND).expect("valid backend URL"),
            anon_key: "test-anon-key".to_string(),
            service_key: None,
        },
        storage: StorageConfig::default(),
        admin_cache_ttl: Duration::from_secs(300),
        retry: RetrySettings {
            attempts: 1,
            base_delay: Duration::ZERO,
        },
        download_url_ttl: Duration::from_secs(60),
        cors_allowed_origin: None,
        sentry: SentryConfig::default(),
    }
}

/// The application router over [`test_config`].
#[must_use]
pub fn test_app() -> Router {
    app_with(test_config())
}

/// The application router over a custom configuration.
#[must_use]
pub fn app_with(config: StorefrontConfig) -> Router {
    template_shop_storefront::app(AppState::new(config))
}

/// Path of the extra route added by [`app_with_sign_in`].
pub const SIGN_IN_PATH: &str = "/_test/sign-in";

/// The API routes plus a route that stores a valid signed-in user in the
/// session, so guards can be driven without a real auth exchange.
///
/// The session cookie from `POST` [`SIGN_IN_PATH`] authenticates later
/// requests to the same router.
#[must_use]
pub fn app_with_sign_in(config: StorefrontConfig) -> Router {
    let session_layer = create_session_layer(&config);
    routes::routes()
        .route(SIGN_IN_PATH, post(sign_in))
        .layer(session_layer)
        .with_state(AppState::new(config))
}

async fn sign_in(session: Session) -> StatusCode {
    let Ok(email) = Email::parse("shopper@example.com") else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    let user = CurrentUser {
        id: UserId::random(),
        email,
        access_token: "test-access-token".to_string(),
        refresh_token: "test-refresh-token".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    };
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The `name=value` part of a response's `Set-Cookie` header.
#[must_use]
pub fn session_cookie(response: &TestResponse) -> Option<String> {
    let set_cookie = response.header(header::SET_COOKIE.as_str())?;
    set_cookie.split(';').next().map(str::to_string)
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// The body parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// The body as text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A header value as text, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Run one request through the router.
///
/// # Panics
///
/// Panics if the router fails or the body cannot be read.
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    TestResponse {
        status,
        headers,
        body,
    }
}

/// A `GET` request.
///
/// # Panics
///
/// Panics on an invalid URI.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri, Body::empty())
}

/// A request with a JSON body, sent from a fixed client address so rate
/// limited routes can key it.
///
/// # Panics
///
/// Panics on an invalid URI.
#[must_use]
pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// A request without a body.
///
/// # Panics
///
/// Panics on an invalid URI.
#[must_use]
pub fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("valid request")
}
