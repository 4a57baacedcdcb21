//! Repositories over the hosted backend's tables.
//!
//! # Tables
//!
//! - `user_profiles` - Profile and role for each auth user
//! - `categories` - Catalog categories
//! - `products` - Templates for sale (file in the private bucket, image in
//!   the public bucket)
//! - `orders` / `order_items` - Purchases
//! - `download_history` - One row per download
//! - `reviews` - One review per user and product
//! - `contact_submissions` - Contact form messages
//!
//! Every repository borrows the shared [`BackendClient`] and the [`Caller`]
//! the request runs as, so row-level security applies to the signed-in user.

pub mod categories;
pub mod contact;
pub mod downloads;
pub mod orders;
pub mod products;
pub mod profiles;
pub mod reviews;

use thiserror::Error;
use tracing::warn;

use crate::backend::BackendError;

pub use categories::CategoryRepository;
pub use contact::ContactRepository;
pub use downloads::DownloadRepository;
pub use orders::OrderRepository;
pub use products::{ProductFilter, ProductPage, ProductRepository, ProductSort};
pub use profiles::ProfileRepository;
pub use reviews::ReviewRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend request failed.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug or review).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<BackendError> for RepositoryError {
    fn from(err: BackendError) -> Self {
        if err.is_unique_violation() {
            let message = match &err {
                BackendError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            };
            Self::Conflict(message)
        } else {
            Self::Backend(err)
        }
    }
}

impl RepositoryError {
    /// Whether the backend refused the caller.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_permission_denied())
    }
}

/// Treat a missing table as an empty list.
///
/// Optional tables (reviews, download history, contact submissions) may not
/// exist in every deployment; listing them should not fail the page.
pub(crate) fn empty_if_missing<T>(
    table: &str,
    result: Result<Vec<T>, BackendError>,
) -> Result<Vec<T>, RepositoryError> {
    match result {
        Ok(rows) => Ok(rows),
        Err(e) if e.is_missing_table() => {
            warn!(table, error = %e, "Table not found, returning empty list");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> BackendError {
        BackendError::Api {
            status,
            code: Some(code.to_string()),
            message: "duplicate key value violates unique constraint".to_string(),
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err = RepositoryError::from(api(409, "23505"));
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m.contains("duplicate key")));
    }

    #[test]
    fn test_other_errors_stay_backend() {
        let err = RepositoryError::from(api(403, "42501"));
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_empty_if_missing() {
        let rows: Vec<u8> = empty_if_missing("reviews", Err(api(404, "42P01"))).unwrap();
        assert!(rows.is_empty());

        let err = empty_if_missing::<u8>("reviews", Err(api(500, "XX000"))).unwrap_err();
        assert!(matches!(err, RepositoryError::Backend(_)));
    }
}
