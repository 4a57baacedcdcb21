//! Review repository.

use tracing::instrument;

use template_shop_core::{NewReview, ProductId, Review, ReviewId};

use super::{RepositoryError, empty_if_missing};
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "reviews";
const SELECT: &str = "*,user_profiles(full_name)";

/// Repository for `reviews`.
pub struct ReviewRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let query = Query::new()
            .select(SELECT)
            .eq("product_id", product_id)
            .order("created_at", Direction::Desc);
        empty_if_missing(TABLE, self.client.select(self.caller, TABLE, &query).await)
    }

    /// All reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32, per_page: u32) -> Result<Vec<Review>, RepositoryError> {
        let query = Query::new()
            .select(SELECT)
            .order("created_at", Direction::Desc)
            .page(page, per_page);
        empty_if_missing(TABLE, self.client.select(self.caller, TABLE, &query).await)
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    #[instrument(skip(self, review), fields(product_id = %review.product_id, rating = review.rating))]
    pub async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        Ok(self.client.insert_one(self.caller, TABLE, review).await?)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let query = Query::new().eq("id", id);
        Ok(self.client.delete(self.caller, TABLE, &query).await?)
    }
}
