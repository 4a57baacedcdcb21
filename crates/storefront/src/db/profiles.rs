//! User profile repository.

use tracing::instrument;

use template_shop_core::{Email, ProfilePatch, RolePatch, UserId, UserProfile, UserRole};

use super::RepositoryError;
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "user_profiles";

/// Repository for `user_profiles`.
pub struct ProfileRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let query = Query::new().eq("id", id);
        Ok(self.client.select_one(self.caller, TABLE, &query).await?)
    }

    /// Get a profile by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<UserProfile>, RepositoryError> {
        let query = Query::new().eq("email", email);
        Ok(self.client.select_one(self.caller, TABLE, &query).await?)
    }

    /// Only the role of a user, `None` when the profile does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn role(&self, id: UserId) -> Result<Option<UserRole>, RepositoryError> {
        Ok(self.get(id).await?.map(|profile| profile.role))
    }

    /// All profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32, per_page: u32) -> Result<Vec<UserProfile>, RepositoryError> {
        let query = Query::new()
            .order("created_at", Direction::Desc)
            .page(page, per_page);
        Ok(self.client.select(self.caller, TABLE, &query).await?)
    }

    /// Number of profiles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.client.count(self.caller, TABLE, &Query::new()).await?)
    }

    /// Update a user's own profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: UserId, patch: &ProfilePatch) -> Result<UserProfile, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<UserProfile> = self.client.update(self.caller, TABLE, &query, patch).await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    #[instrument(skip(self))]
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<UserProfile, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<UserProfile> = self
            .client
            .update(self.caller, TABLE, &query, &RolePatch { role })
            .await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }
}
