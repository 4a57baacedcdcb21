//! Download history repository.

use tracing::instrument;

use template_shop_core::{DownloadRecord, NewDownloadRecord, UserId};

use super::{RepositoryError, empty_if_missing};
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "download_history";

/// Repository for `download_history`.
pub struct DownloadRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> DownloadRepository<'a> {
    /// Create a new download history repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// A user's downloads, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<DownloadRecord>, RepositoryError> {
        let query = Query::new()
            .select("*,products(title,slug,image_url)")
            .eq("user_id", user_id)
            .order("downloaded_at", Direction::Desc);
        empty_if_missing(TABLE, self.client.select(self.caller, TABLE, &query).await)
    }

    /// Record a download.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    #[instrument(skip(self, record), fields(user_id = %record.user_id, product_id = %record.product_id))]
    pub async fn record(&self, record: &NewDownloadRecord) -> Result<DownloadRecord, RepositoryError> {
        Ok(self.client.insert_one(self.caller, TABLE, record).await?)
    }
}
