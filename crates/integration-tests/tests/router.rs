//! In-process tests of the storefront router and its middleware stack.
//!
//! The backend URL points at a closed port, so these tests cover everything
//! that is decided before the backend is consulted: guards, validation,
//! headers, rate limits and the empty-cart path.

use axum::body::Body;
use axum::http::{Method, StatusCode, header};
use serde_json::json;
use uuid::Uuid;

use template_shop_integration_tests::{
    SIGN_IN_PATH, app_with, app_with_sign_in, get, json_request, request, send, session_cookie,
    test_app, test_config,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let app = test_app();
    let response = send(&app, get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_ready_reports_unreachable_backend() {
    let app = test_app();
    let response = send(&app, get("/health/ready")).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();
    let response = send(&app, get("/api/nope")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let app = test_app();
    let response = send(&app, get("/health")).await;

    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(response.header("cache-control"), Some("no-store"));
    assert!(response.header("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_hsts_when_served_over_https() {
    let mut config = test_config();
    config.base_url = "https://shop.example".to_string();
    let app = app_with(config);

    let response = send(&app, get("/health")).await;
    assert!(response.header("strict-transport-security").is_some());
}

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let app = test_app();

    let generated = send(&app, get("/health")).await;
    let id = generated.header("x-request-id").unwrap_or_default();
    assert!(Uuid::parse_str(id).is_ok());

    let mut req = get("/health");
    req.headers_mut()
        .insert("x-request-id", "edge-1234".parse().expect("valid header"));
    let echoed = send(&app, req).await;
    assert_eq!(echoed.header("x-request-id"), Some("edge-1234"));
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let mut config = test_config();
    config.cors_allowed_origin = Some("https://shop.example".to_string());
    let app = app_with(config);

    let req = axum::http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/products")
        .header("origin", "https://shop.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .expect("valid request");
    let response = send(&app, req).await;

    assert!(response.status.is_success());
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://shop.example")
    );
    assert_eq!(
        response.header("access-control-allow-credentials"),
        Some("true")
    );
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn test_signed_out_visitors_are_rejected() {
    let app = test_app();
    let product = Uuid::new_v4();

    let cases = [
        (Method::GET, "/api/account/profile".to_string()),
        (Method::GET, "/api/account/orders".to_string()),
        (Method::GET, "/api/account/downloads".to_string()),
        (Method::POST, "/api/checkout".to_string()),
        (Method::GET, format!("/api/downloads/{product}")),
        (Method::GET, "/api/admin/stats".to_string()),
        (Method::GET, "/api/admin/orders".to_string()),
    ];

    for (method, uri) in cases {
        let response = send(&app, request(method.clone(), &uri, Body::empty())).await;
        assert_eq!(
            response.status,
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require sign-in"
        );
        assert_eq!(response.json()["error"], "Authentication required");
    }
}

#[tokio::test]
async fn test_admin_guard_fails_closed_when_backend_is_down() {
    let app = app_with_sign_in(test_config());

    let signed_in = send(&app, request(Method::POST, SIGN_IN_PATH, Body::empty())).await;
    assert_eq!(signed_in.status, StatusCode::NO_CONTENT);
    let cookie = session_cookie(&signed_in).expect("session cookie set");

    let with_cookie = |method: Method, uri: &str| {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("valid request")
    };

    // The profile lookup cannot reach the backend, so the status is unknown
    for uri in ["/api/admin/stats", "/api/admin/orders"] {
        let response = send(&app, with_cookie(Method::GET, uri)).await;
        assert_eq!(
            response.status,
            StatusCode::SERVICE_UNAVAILABLE,
            "{uri} should fail closed"
        );
        assert_eq!(
            response.json()["error"],
            "Could not verify permissions, please try again"
        );
    }

    let status = send(&app, with_cookie(Method::GET, "/api/auth/admin-status")).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.json(), json!({ "status": "error", "is_admin": false }));
}

#[tokio::test]
async fn test_review_requires_sign_in() {
    let app = test_app();
    let uri = format!("/api/products/{}/reviews", Uuid::new_v4());
    let body = json!({ "rating": 5, "comment": "Great" });

    let response = send(&app, json_request(Method::POST, &uri, &body)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_signed_out_session() {
    let app = test_app();

    let session = send(&app, get("/api/auth/session")).await;
    assert_eq!(session.status, StatusCode::OK);
    let body = session.json();
    assert!(body["user"].is_null());
    assert_eq!(body["admin_status"], "not_admin");

    let status = send(&app, get("/api/auth/admin-status")).await;
    assert_eq!(status.json(), json!({ "status": "not_admin", "is_admin": false }));
}

#[tokio::test]
async fn test_signout_without_session() {
    let app = test_app();
    let response = send(&app, request(Method::POST, "/api/auth/signout", Body::empty())).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_empty_cart_needs_no_backend() {
    let app = test_app();
    let response = send(&app, get("/api/cart")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["count"], 0);
    assert_eq!(body["items"], json!([]));
}

// =============================================================================
// Input handling
// =============================================================================

#[tokio::test]
async fn test_malformed_product_id_is_not_found() {
    let app = test_app();
    let response = send(&app, get("/api/products/not-a-uuid/reviews")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_validation_and_rate_limit() {
    let app = test_app();
    let invalid = json!({
        "name": "Ada",
        "email": "not-an-email",
        "message": "Hello",
    });

    // The burst allows three submissions from one address
    for _ in 0..3 {
        let response = send(&app, json_request(Method::POST, "/api/contact", &invalid)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["error"].is_string());
    }

    let limited = send(&app, json_request(Method::POST, "/api/contact", &invalid)).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_backend_outage_is_a_server_error() {
    let app = test_app();
    let response = send(&app, get("/api/categories")).await;

    assert!(response.status.is_server_error());
    // Internal details stay out of the response
    let message = response.json()["error"].as_str().unwrap_or_default().to_string();
    assert!(!message.contains("127.0.0.1"));
}
