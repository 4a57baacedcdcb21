//! Template Shop storefront library.
//!
//! JSON API for the template store: catalog, cart, checkout, downloads,
//! accounts and the back-office. The hosted backend is the system of record;
//! this crate talks to it over HTTP and keeps only sessions and short-lived
//! caches in memory.
//!
//! Exposed as a library so the router can be exercised from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::StorefrontConfig;
use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();

    let mut router = routes::routes()
        .layer(middleware::create_session_layer(config))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ));

    if config.is_secure() {
        router = router.layer(axum::middleware::from_fn(middleware::hsts_middleware));
    }
    if let Some(cors) = cors_layer(config) {
        router = router.layer(cors);
    }

    router
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// CORS for the browser front-end, when its origin is configured.
///
/// Credentials are allowed so the session cookie travels with API calls.
fn cors_layer(config: &StorefrontConfig) -> Option<CorsLayer> {
    let origin = config.cors_allowed_origin.as_deref()?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(origin, error = %e, "Ignoring invalid CORS_ALLOWED_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(60 * 60)),
    )
}
