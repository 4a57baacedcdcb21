//! Table access over the backend's REST surface.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::{ApiErrorBody, BackendError, Query, RetryPolicy};
use crate::config::BackendConfig;

/// Who a request is made on behalf of.
///
/// Row-level security in the backend decides what each caller may see, so
/// user requests must carry the user's own access token.
#[derive(Debug, Clone, Copy)]
pub enum Caller<'a> {
    /// Anonymous visitor (anon key only).
    Anon,
    /// Signed-in user with their access token.
    User(&'a str),
    /// Service role; bypasses row-level security. CLI and maintenance only.
    Service,
}

/// Client for the hosted backend.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: Option<SecretString>,
    retry: RetryPolicy,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_key: config.service_key.clone(),
                retry,
            }),
        }
    }

    /// Project base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Retry policy applied to reads.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    // =========================================================================
    // Table reads (retried)
    // =========================================================================

    /// Fetch rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails or the failure is permanent.
    #[instrument(skip(self, caller, query), fields(table = %table, query = %query.to_query_string()))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, BackendError> {
        let url = &self.table_url(table, query)?;
        self.inner
            .retry
            .run(move || async move {
                let response = self.send(self.request(Method::GET, url.clone(), caller)?).await?;
                Self::parse_json(response).await
            })
            .await
    }

    /// Fetch the first row matching `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails or the failure is permanent.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>, BackendError> {
        let query = query.clone().limit(1);
        let rows: Vec<T> = self.select(caller, table, &query).await?;
        Ok(rows.into_iter().next())
    }

    /// Count rows matching `query` without fetching them.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails or the count header is missing.
    #[instrument(skip(self, caller, query), fields(table = %table))]
    pub async fn count(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<u64, BackendError> {
        let url = &self.table_url(table, query)?;
        self.inner
            .retry
            .run(move || async move {
                let request = self
                    .request(Method::HEAD, url.clone(), caller)?
                    .header("Prefer", "count=exact");
                let response = self.send(request).await?;
                let header = response
                    .headers()
                    .get("Content-Range")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                content_range_total(header)
            })
            .await
    }

    // =========================================================================
    // Table writes (sent once)
    // =========================================================================

    /// Insert one or more rows and return them as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip(self, caller, body), fields(table = %table))]
    pub async fn insert<B, T>(
        &self,
        caller: Caller<'_>,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &Query::new())?;
        let request = self
            .request(Method::POST, url, caller)?
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }

    /// Insert rows without reading them back.
    ///
    /// For tables the caller may write but not read.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip(self, caller, body), fields(table = %table))]
    pub async fn insert_silent<B>(
        &self,
        caller: Caller<'_>,
        table: &str,
        body: &B,
    ) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &Query::new())?;
        let request = self
            .request(Method::POST, url, caller)?
            .header("Prefer", "return=minimal")
            .json(body);
        self.send(request).await?;
        Ok(())
    }

    /// Insert a single row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert or returns no row.
    pub async fn insert_one<B, T>(
        &self,
        caller: Caller<'_>,
        table: &str,
        body: &B,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.insert(caller, table, body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("inserted row in {table}")))
    }

    /// Update rows matching `query` and return them as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` has no filter or the backend rejects the update.
    #[instrument(skip(self, caller, query, body), fields(table = %table, query = %query.to_query_string()))]
    pub async fn update<B, T>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
        body: &B,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::require_filter(table, query)?;
        let url = self.table_url(table, query)?;
        let request = self
            .request(Method::PATCH, url, caller)?
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }

    /// Delete rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if `query` has no filter or the backend rejects the delete.
    #[instrument(skip(self, caller, query), fields(table = %table, query = %query.to_query_string()))]
    pub async fn delete(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<(), BackendError> {
        Self::require_filter(table, query)?;
        let url = self.table_url(table, query)?;
        self.send(self.request(Method::DELETE, url, caller)?).await?;
        Ok(())
    }

    /// Check that the REST surface answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the anon key.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let url = Url::parse(&format!("{}/rest/v1/", self.inner.base_url))?;
        self.send(self.request(Method::GET, url, Caller::Anon)?).await?;
        Ok(())
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Start a request with the `apikey` and `Authorization` headers for `caller`.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        caller: Caller<'_>,
    ) -> Result<RequestBuilder, BackendError> {
        let (api_key, bearer) = match caller {
            Caller::Anon => (self.inner.anon_key.as_str(), self.inner.anon_key.as_str()),
            Caller::User(token) => (self.inner.anon_key.as_str(), token),
            Caller::Service => {
                let key = self
                    .inner
                    .service_key
                    .as_ref()
                    .ok_or(BackendError::MissingServiceKey)?
                    .expose_secret();
                (key, key)
            }
        };

        Ok(self
            .inner
            .http
            .request(method, url)
            .header("apikey", api_key)
            .bearer_auth(bearer))
    }

    /// Send a request and turn non-success statuses into [`BackendError`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ApiErrorBody::into_error(status.as_u16(), &body);
            tracing::debug!(status = %status, error = %error, "Backend returned non-success status");
            return Err(error);
        }

        Ok(response)
    }

    /// Parse a JSON body, logging a truncated copy when it does not match `T`.
    pub(crate) async fn parse_json<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, BackendError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Build a URL under the project base.
    pub(crate) fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(Url::parse(&format!("{}{path}", self.inner.base_url))?)
    }

    fn table_url(&self, table: &str, query: &Query) -> Result<Url, BackendError> {
        let mut url = self.url(&format!("/rest/v1/{table}"))?;
        let pairs = query.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn require_filter(table: &str, query: &Query) -> Result<(), BackendError> {
        if query.has_filters() {
            Ok(())
        } else {
            Err(BackendError::Api {
                status: 400,
                code: None,
                message: format!("refusing unfiltered write to {table}"),
            })
        }
    }
}

/// Parse the total from a `Content-Range` header such as `0-24/137` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// The exact row count of a `count=exact` answer.
fn content_range_total(header: &str) -> Result<u64, BackendError> {
    parse_content_range_total(header).ok_or_else(|| {
        BackendError::MalformedResponse(format!("no total in Content-Range {header:?}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::Retryable;

    fn client(service_key: Option<&str>) -> BackendClient {
        BackendClient::new(
            &BackendConfig {
                url: Url::parse("https://project.backend.test/").unwrap(),
                anon_key: "anon".to_string(),
                service_key: service_key.map(|k| SecretString::from(k.to_string())),
            },
            RetryPolicy::none(),
        )
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/137"), Some(137));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total(""), None);
    }

    #[test]
    fn test_missing_count_is_not_retried() {
        assert_eq!(content_range_total("0-9/10").unwrap(), 10);
        let err = content_range_total("").unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_table_url_encodes_query() {
        let client = client(None);
        let url = client
            .table_url(
                "products",
                &Query::new().eq("slug", "landing page").limit(1),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.backend.test/rest/v1/products?slug=eq.landing+page&limit=1"
        );
    }

    #[test]
    fn test_service_caller_requires_key() {
        let client = client(None);
        let url = client.url("/rest/v1/orders").unwrap();
        let result = client.request(Method::GET, url, Caller::Service);
        assert!(matches!(result, Err(BackendError::MissingServiceKey)));
    }

    #[test]
    fn test_user_caller_sends_token() {
        let client = client(Some("service"));
        let url = client.url("/rest/v1/orders").unwrap();
        let request = client
            .request(Method::GET, url, Caller::User("user-token"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.headers()["apikey"], "anon");
        assert_eq!(request.headers()["authorization"], "Bearer user-token");
    }

    #[test]
    fn test_unfiltered_writes_are_refused() {
        assert!(BackendClient::require_filter("products", &Query::new()).is_err());
        assert!(BackendClient::require_filter("products", &Query::new().eq("id", 1)).is_ok());
    }
}
