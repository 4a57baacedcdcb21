//! Object storage calls against the backend's storage surface.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{BackendClient, BackendError, Caller};

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl BackendClient {
    /// Upload an object, replacing any existing object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage service rejects the upload.
    #[instrument(skip(self, caller, body), fields(bucket = %bucket, path = %path))]
    pub async fn upload(
        &self,
        caller: Caller<'_>,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), BackendError> {
        let url = self.url(&format!(
            "/storage/v1/object/{}/{}",
            encode_segment(bucket),
            encode_path(path)
        ))?;
        let request = self
            .request(Method::POST, url, caller)?
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(body);
        self.send(request).await?;
        Ok(())
    }

    /// Remove objects from a bucket. Missing objects are ignored by the
    /// storage service.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage service rejects the request.
    #[instrument(skip(self, caller), fields(bucket = %bucket))]
    pub async fn remove(
        &self,
        caller: Caller<'_>,
        bucket: &str,
        paths: &[String],
    ) -> Result<(), BackendError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.url(&format!("/storage/v1/object/{}", encode_segment(bucket)))?;
        let request = self
            .request(Method::DELETE, url, caller)?
            .json(&RemoveRequest { prefixes: paths });
        self.send(request).await?;
        Ok(())
    }

    /// Create a time-limited download URL for a private object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the caller may not
    /// read it.
    #[instrument(skip(self, caller), fields(bucket = %bucket, path = %path))]
    pub async fn create_signed_url(
        &self,
        caller: Caller<'_>,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, BackendError> {
        let url = self.url(&format!(
            "/storage/v1/object/sign/{}/{}",
            encode_segment(bucket),
            encode_path(path)
        ))?;
        let request = self
            .request(Method::POST, url, caller)?
            .json(&SignRequest {
                expires_in: expires_in.as_secs().max(1),
            });
        let response = self.send(request).await?;
        let signed: SignResponse = Self::parse_json(response).await?;
        Ok(self.absolute_signed_url(&signed.signed_url))
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url(),
            encode_segment(bucket),
            encode_path(path)
        )
    }

    /// The storage service returns signed URLs relative to `/storage/v1`.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_string();
        }
        let relative = signed.trim_start_matches('/');
        format!("{}/storage/v1/{relative}", self.base_url())
    }
}

/// Object path inside the bucket that a public URL points at, if `url` is a
/// public URL of `bucket` on this backend.
#[must_use]
pub fn object_path_from_public_url<'a>(
    base_url: &str,
    bucket: &str,
    url: &'a str,
) -> Option<&'a str> {
    let prefix = format!("{base_url}/storage/v1/object/public/{bucket}/");
    url.strip_prefix(prefix.as_str())
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::backend::RetryPolicy;
    use crate::config::BackendConfig;

    fn client() -> BackendClient {
        BackendClient::new(
            &BackendConfig {
                url: Url::parse("https://project.backend.test").unwrap(),
                anon_key: "anon".to_string(),
                service_key: Some(SecretString::from("service".to_string())),
            },
            RetryPolicy::none(),
        )
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(
            encode_path("/products/abc/My Template.zip"),
            "products/abc/My%20Template.zip"
        );
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            client().public_url("product-images", "p/1/cover.png"),
            "https://project.backend.test/storage/v1/object/public/product-images/p/1/cover.png"
        );
    }

    #[test]
    fn test_absolute_signed_url() {
        let client = client();
        assert_eq!(
            client.absolute_signed_url("/object/sign/templates/a.zip?token=t"),
            "https://project.backend.test/storage/v1/object/sign/templates/a.zip?token=t"
        );
        assert_eq!(
            client.absolute_signed_url("https://cdn.test/a.zip"),
            "https://cdn.test/a.zip"
        );
    }

    #[test]
    fn test_object_path_from_public_url() {
        let client = client();
        let url = client.public_url("product-images", "p/1/cover.png");
        assert_eq!(
            object_path_from_public_url(client.base_url(), "product-images", &url),
            Some("p/1/cover.png")
        );
        assert_eq!(
            object_path_from_public_url(client.base_url(), "templates", &url),
            None
        );
    }
}
