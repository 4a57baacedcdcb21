//! Category repository.

use tracing::instrument;

use template_shop_core::{Category, CategoryId, CategoryPatch, NewCategory};

use super::{RepositoryError, empty_if_missing};
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "categories";

/// Repository for `categories`.
pub struct CategoryRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let query = Query::new().order("name", Direction::Asc);
        empty_if_missing(TABLE, self.client.select(self.caller, TABLE, &query).await)
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let query = Query::new().eq("slug", slug);
        Ok(self.client.select_one(self.caller, TABLE, &query).await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, category), fields(slug = %category.slug))]
    pub async fn create(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        Ok(self.client.insert_one(self.caller, TABLE, category).await?)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no category has this id.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> Result<Category, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<Category> = self.client.update(self.caller, TABLE, &query, patch).await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Products in it keep existing without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let query = Query::new().eq("id", id);
        Ok(self.client.delete(self.caller, TABLE, &query).await?)
    }
}
