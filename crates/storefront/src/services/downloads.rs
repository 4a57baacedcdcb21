//! Download authorization and signed links.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use template_shop_core::{NewDownloadRecord, Product, ProductId};

use crate::backend::{BackendClient, BackendError};
use crate::db::{DownloadRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::CurrentUser;

/// Errors that can occur when preparing a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("product not found")]
    ProductNotFound,

    /// The product is paid and the user has no completed order for it.
    #[error("purchase required")]
    NotPurchased,

    /// The product has no file attached.
    #[error("no file available for this product")]
    NoFile,

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("storage error: {0}")]
    Storage(#[from] BackendError),
}

/// A time-limited link to a product file.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub product_id: ProductId,
    pub url: String,
    pub file_name: String,
    pub expires_in: u64,
}

/// Whether a user may download `product`.
///
/// Active free products are open to every signed-in user; anything else
/// needs a completed purchase. Purchased products stay downloadable after
/// they are withdrawn from sale.
#[must_use]
pub fn may_download(product: &Product, purchased: bool) -> bool {
    purchased || (product.is_active && product.price.is_free())
}

/// Download service, acting as the signed-in user.
pub struct DownloadService<'a> {
    client: &'a BackendClient,
    user: &'a CurrentUser,
    bucket: &'a str,
    link_ttl: Duration,
}

impl<'a> DownloadService<'a> {
    /// Create a new download service for files in `bucket`.
    #[must_use]
    pub const fn new(
        client: &'a BackendClient,
        user: &'a CurrentUser,
        bucket: &'a str,
        link_ttl: Duration,
    ) -> Self {
        Self {
            client,
            user,
            bucket,
            link_ttl,
        }
    }

    /// Check access to a product's file and create a signed link to it.
    ///
    /// The download is recorded in the user's history and counted on the
    /// product. Both are best effort and never fail the download.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::NotPurchased` if the user may not download the
    /// product, `DownloadError::NoFile` if it has no file.
    #[instrument(skip(self), fields(user_id = %self.user.id))]
    pub async fn prepare(&self, product_id: ProductId) -> Result<DownloadLink, DownloadError> {
        let products = ProductRepository::new(self.client, self.user.caller());
        let product = products
            .get(product_id)
            .await?
            .ok_or(DownloadError::ProductNotFound)?;

        let purchased = if product.price.is_free() {
            false
        } else {
            OrderRepository::new(self.client, self.user.caller())
                .has_purchased(self.user.id, product_id)
                .await?
        };
        if !may_download(&product, purchased) {
            return Err(DownloadError::NotPurchased);
        }

        let path = product.file_path.as_deref().ok_or(DownloadError::NoFile)?;
        let url = self
            .client
            .create_signed_url(self.user.caller(), self.bucket, path, self.link_ttl)
            .await?;

        let history = DownloadRepository::new(self.client, self.user.caller());
        let record = NewDownloadRecord {
            user_id: self.user.id,
            product_id,
        };
        if let Err(e) = history.record(&record).await {
            warn!(error = %e, "Failed to record download history");
        }
        if let Err(e) = products.increment_download_count(&product).await {
            warn!(error = %e, "Failed to bump download count");
        }

        info!(%product_id, "Download link issued");
        Ok(DownloadLink {
            product_id,
            url,
            file_name: file_name(path),
            expires_in: self.link_ttl.as_secs(),
        })
    }
}

/// Last segment of an object path.
fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
