//! Command implementations.

pub mod admin;
pub mod check;
pub mod seed;

use thiserror::Error;

use template_shop_core::EmailError;
use template_shop_storefront::backend::{BackendClient, BackendError, RetryPolicy};
use template_shop_storefront::config::{BackendConfig, ConfigError};
use template_shop_storefront::db::RepositoryError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend could not be reached or refused the request.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email address on the command line.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account uses the given email address.
    #[error("no user with email: {0}")]
    UserNotFound(String),

    /// The seed file could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// A product names a category that is neither in the file nor stored.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// The seed file is not valid YAML for a catalog.
    #[error("invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The seed file parsed but some entries are invalid.
    #[error("{0} validation errors found")]
    Invalid(usize),
}

/// Load backend settings and build a client.
///
/// `require_service_key` is set for commands that write as the service role.
fn connect(require_service_key: bool) -> Result<(BackendConfig, BackendClient), CommandError> {
    dotenvy::dotenv().ok();
    let config = BackendConfig::from_env(require_service_key)?;
    let client = BackendClient::new(&config, RetryPolicy::default());
    Ok((config, client))
}
