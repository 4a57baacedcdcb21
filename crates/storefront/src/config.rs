//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_URL` - Hosted backend project URL (e.g., `https://abc.backend.example`)
//! - `BACKEND_ANON_KEY` - Backend anonymous (public) API key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_SERVICE_KEY` - Service-role key, bypasses row-level security (CLI only)
//! - `STORAGE_TEMPLATES_BUCKET` - Private bucket for template files (default: templates)
//! - `STORAGE_IMAGES_BUCKET` - Public bucket for product images (default: product-images)
//! - `ADMIN_CACHE_TTL_SECS` - Admin status cache lifetime, 1 to 1800 (default: 1800)
//! - `BACKEND_RETRY_ATTEMPTS` - Attempts per backend read (default: 3)
//! - `BACKEND_RETRY_DELAY_MS` - Base retry delay, grows linearly (default: 1000)
//! - `DOWNLOAD_URL_TTL_SECS` - Signed download URL lifetime (default: 3600)
//! - `CORS_ALLOWED_ORIGIN` - Origin of the browser front-end, enables CORS
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Longest time an admin status may be served from cache.
pub const MAX_ADMIN_CACHE_TTL_SECS: u64 = 30 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Hosted backend connection settings
    pub backend: BackendConfig,
    /// Storage bucket names
    pub storage: StorageConfig,
    /// How long a determined admin status stays valid
    pub admin_cache_ttl: Duration,
    /// Retry behaviour for backend reads
    pub retry: RetrySettings,
    /// Lifetime of signed download URLs
    pub download_url_ttl: Duration,
    /// Browser front-end origin allowed by CORS
    pub cors_allowed_origin: Option<String>,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project URL, without trailing slash
    pub url: Url,
    /// Anonymous API key (public, row-level security applies)
    pub anon_key: String,
    /// Service-role key (bypasses row-level security, never sent to browsers)
    pub service_key: Option<SecretString>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &self.anon_key)
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Storage bucket names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Private bucket holding downloadable template archives
    pub templates_bucket: String,
    /// Public bucket holding product images
    pub images_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            templates_bucket: "templates".to_string(),
            images_bucket: "product-images".to_string(),
        }
    }
}

/// Retry behaviour for backend reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay after the first failure; the n-th failure waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let backend = BackendConfig::from_env(false)?;

        let storage = StorageConfig {
            templates_bucket: get_env_or_default("STORAGE_TEMPLATES_BUCKET", "templates"),
            images_bucket: get_env_or_default("STORAGE_IMAGES_BUCKET", "product-images"),
        };

        let admin_cache_ttl =
            admin_cache_ttl(parse_env_or_default::<u64>("ADMIN_CACHE_TTL_SECS", "1800")?)?;

        let attempts = parse_env_or_default::<u32>("BACKEND_RETRY_ATTEMPTS", "3")?;
        if attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BACKEND_RETRY_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let retry = RetrySettings {
            attempts,
            base_delay: Duration::from_millis(parse_env_or_default::<u64>(
                "BACKEND_RETRY_DELAY_MS",
                "1000",
            )?),
        };

        let download_url_ttl =
            Duration::from_secs(parse_env_or_default::<u64>("DOWNLOAD_URL_TTL_SECS", "3600")?);

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            storage,
            admin_cache_ttl,
            retry,
            download_url_ttl,
            cors_allowed_origin: get_optional_env("CORS_ALLOWED_ORIGIN"),
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    /// Load backend settings from the environment.
    ///
    /// When `require_service_key` is set (CLI administration commands), the
    /// service key must be present and pass the strength check.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, the URL is
    /// invalid, or the service key looks like a placeholder.
    pub fn from_env(require_service_key: bool) -> Result<Self, ConfigError> {
        let raw_url = get_required_env("BACKEND_URL")?;
        let url = parse_backend_url(&raw_url)?;
        let anon_key = get_required_env("BACKEND_ANON_KEY")?;

        let service_key = match get_optional_env("BACKEND_SERVICE_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "BACKEND_SERVICE_KEY")?;
                Some(SecretString::from(value))
            }
            None if require_service_key => {
                return Err(ConfigError::MissingEnvVar("BACKEND_SERVICE_KEY".to_string()));
            }
            None => None,
        };

        Ok(Self {
            url,
            anon_key,
            service_key,
        })
    }

    /// The service key, if configured.
    #[must_use]
    pub fn service_key(&self) -> Option<&str> {
        self.service_key.as_ref().map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the backend URL, rejecting anything that is not http(s).
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "BACKEND_URL".to_string(),
            "must be an http(s) URL with a host".to_string(),
        ));
    }

    Ok(url)
}

/// Admin status cache lifetime, bounded to `1..=MAX_ADMIN_CACHE_TTL_SECS`.
fn admin_cache_ttl(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs > MAX_ADMIN_CACHE_TTL_SECS {
        return Err(ConfigError::InvalidEnvVar(
            "ADMIN_CACHE_TTL_SECS".to_string(),
            format!("must be between 1 and {MAX_ADMIN_CACHE_TTL_SECS}"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the backend."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig {
                url: Url::parse("https://project.backend.test").unwrap(),
                anon_key: "anon-public-key".to_string(),
                service_key: Some(SecretString::from("super_service_role_value")),
            },
            storage: StorageConfig::default(),
            admin_cache_ttl: Duration::from_secs(1800),
            retry: RetrySettings::default(),
            download_url_ttl: Duration::from_secs(3600),
            cors_allowed_origin: None,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-service-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_backend_url_trims_trailing_slash() {
        let url = parse_backend_url("https://project.backend.test/").unwrap();
        assert_eq!(url.host_str(), Some("project.backend.test"));
    }

    #[test]
    fn test_parse_backend_url_rejects_other_schemes() {
        assert!(parse_backend_url("ftp://project.backend.test").is_err());
        assert!(parse_backend_url("not a url").is_err());
    }

    #[test]
    fn test_admin_cache_ttl_bounds() {
        assert_eq!(admin_cache_ttl(1).unwrap(), Duration::from_secs(1));
        assert_eq!(
            admin_cache_ttl(MAX_ADMIN_CACHE_TTL_SECS).unwrap(),
            Duration::from_secs(1800)
        );
        assert!(matches!(
            admin_cache_ttl(0),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ADMIN_CACHE_TTL_SECS"
        ));
        assert!(admin_cache_ttl(MAX_ADMIN_CACHE_TTL_SECS + 1).is_err());
        assert!(admin_cache_ttl(40_000_000_000).is_err());
    }

    #[test]
    fn test_defaults() {
        let retry = RetrySettings::default();
        assert_eq!(retry.attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_secs(1));
        assert_eq!(StorageConfig::default().templates_bucket, "templates");
    }

    #[test]
    fn test_socket_addr_and_secure() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_backend_config_debug_redacts_service_key() {
        let config = test_config();
        let debug_output = format!("{:?}", config.backend);

        assert!(debug_output.contains("project.backend.test"));
        assert!(debug_output.contains("anon-public-key"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_service_role_value"));
    }
}
