//! Hosted backend (BaaS) client.
//!
//! # Architecture
//!
//! - The backend is the system of record for every table, for authentication
//!   and for file storage. There is no local database.
//! - `reqwest` talks to three REST surfaces: tables (`/rest/v1`), auth
//!   (`/auth/v1`) and storage (`/storage/v1`).
//! - Reads go through [`RetryPolicy`] (linear backoff, aborts on permission
//!   errors). Writes are sent once.
//! - Public catalog listings are cached in memory via `moka` (5 minute TTL).
//!
//! # Example
//!
//! ```rust,ignore
//! use template_shop_storefront::backend::{BackendClient, Caller, Query};
//!
//! let client = BackendClient::new(&config.backend, RetryPolicy::default());
//!
//! let products: Vec<Product> = client
//!     .select(Caller::Anon, "products", &Query::new().eq("is_active", true).limit(12))
//!     .await?;
//! ```

mod auth;
mod cache;
mod client;
mod query;
pub mod retry;
mod storage;

pub use auth::{AuthSession, AuthUser, SignUpOutcome};
pub use cache::{CatalogCache, CatalogKey, CatalogValue};
pub use client::{BackendClient, Caller};
pub use query::{Direction, Query};
pub use retry::{RetryPolicy, Retryable};
pub use storage::object_path_from_public_url;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{}", format_api_error(.status, .code, .message))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response lacked something every well-formed answer carries.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// Building a request URL failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An expected row or object was absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A service-role call was made without a configured service key.
    #[error("Backend service key is not configured")]
    MissingServiceKey,
}

/// Postgres error code for insufficient privilege.
const INSUFFICIENT_PRIVILEGE: &str = "42501";
/// REST layer code for a rejected JWT.
const JWT_REJECTED: &str = "PGRST301";
/// Postgres error code for an undefined table.
const UNDEFINED_TABLE: &str = "42P01";
/// REST layer code for a table missing from the schema cache.
const TABLE_NOT_IN_SCHEMA: &str = "PGRST205";
/// Postgres error code for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

impl BackendError {
    /// Whether the backend refused the caller (row-level security, expired or
    /// missing token, wrong role).
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                matches!(status, 401 | 403)
                    || matches!(code.as_deref(), Some(INSUFFICIENT_PRIVILEGE | JWT_REJECTED))
            }
            _ => false,
        }
    }

    /// Whether the queried table does not exist.
    #[must_use]
    pub fn is_missing_table(&self) -> bool {
        matches!(
            self,
            Self::Api { code: Some(code), .. } if code == UNDEFINED_TABLE || code == TABLE_NOT_IN_SCHEMA
        )
    }

    /// Whether an insert or update collided with a unique constraint.
    ///
    /// A bare 409 counts only when the backend sent no code; other 409s, such
    /// as foreign-key violations, are not duplicates.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => match code.as_deref() {
                Some(code) => code == UNIQUE_VIOLATION,
                None => *status == 409,
            },
            _ => false,
        }
    }

    /// HTTP status returned by the backend, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Machine-readable error code returned by the backend, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Error body returned by the backend.
///
/// The table, auth and storage surfaces each use different field names, so
/// every field is optional and [`ApiErrorBody::into_error`] picks the first
/// one present.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ApiErrorBody {
    /// Build a [`BackendError::Api`] from a response status and raw body.
    pub(crate) fn into_error(status: u16, body: &str) -> BackendError {
        let parsed: Self = serde_json::from_str(body).unwrap_or_default();

        let code = parsed
            .error_code
            .or_else(|| match parsed.code {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            })
            .or_else(|| parsed.error.clone());

        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| body.chars().take(200).collect());

        BackendError::Api {
            status,
            code,
            message,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::ref_option)] // thiserror passes fields by reference
fn format_api_error(status: &u16, code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("Backend error {status} ({code}): {message}"),
        None => format!("Backend error {status}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<&str>) -> BackendError {
        BackendError::Api {
            status,
            code: code.map(String::from),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_permission_denied_classification() {
        assert!(api(401, None).is_permission_denied());
        assert!(api(403, None).is_permission_denied());
        assert!(api(400, Some("42501")).is_permission_denied());
        assert!(api(401, Some("PGRST301")).is_permission_denied());
        assert!(!api(500, None).is_permission_denied());
        assert!(!BackendError::RateLimited(1).is_permission_denied());
    }

    #[test]
    fn test_missing_table_classification() {
        assert!(api(404, Some("42P01")).is_missing_table());
        assert!(api(404, Some("PGRST205")).is_missing_table());
        assert!(!api(404, None).is_missing_table());
    }

    #[test]
    fn test_unique_violation_classification() {
        assert!(api(409, Some("23505")).is_unique_violation());
        assert!(api(409, None).is_unique_violation());
        assert!(!api(400, Some("22P02")).is_unique_violation());
    }

    #[test]
    fn test_foreign_key_violation_is_not_unique() {
        let err = ApiErrorBody::into_error(
            409,
            r#"{"code":"23503","details":"Key is still referenced from table \"products\".","hint":null,"message":"update or delete on table \"categories\" violates foreign key constraint"}"#,
        );
        assert_eq!(err.code(), Some("23503"));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_error_body_from_table_surface() {
        let err = ApiErrorBody::into_error(
            404,
            r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public.reviews\" does not exist"}"#,
        );
        assert!(err.is_missing_table());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_error_body_from_auth_surface() {
        let err = ApiErrorBody::into_error(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(
            err.to_string(),
            "Backend error 400 (invalid_credentials): Invalid login credentials"
        );
    }

    #[test]
    fn test_error_body_from_legacy_auth_surface() {
        let err = ApiErrorBody::into_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(err.to_string().ends_with("Invalid login credentials"));
    }

    #[test]
    fn test_error_body_not_json() {
        let err = ApiErrorBody::into_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Backend error 502: Bad Gateway");
        assert_eq!(err.status(), Some(502));
    }
}
