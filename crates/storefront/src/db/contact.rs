//! Contact submission repository.

use tracing::instrument;

use template_shop_core::{
    ContactStatus, ContactStatusPatch, ContactSubmission, ContactSubmissionId,
    NewContactSubmission,
};

use super::{RepositoryError, empty_if_missing};
use crate::backend::{BackendClient, Caller, Direction, Query};

const TABLE: &str = "contact_submissions";

/// Repository for `contact_submissions`.
pub struct ContactRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact submission repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// Store a submission.
    ///
    /// The insert does not ask for the stored row back: anonymous visitors
    /// may insert but not read submissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    #[instrument(skip(self, submission), fields(email = %submission.email))]
    pub async fn create(&self, submission: &NewContactSubmission) -> Result<(), RepositoryError> {
        self.client.insert_silent(self.caller, TABLE, submission).await?;
        Ok(())
    }

    /// Submissions, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<ContactStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ContactSubmission>, RepositoryError> {
        let mut query = Query::new();
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        let query = query
            .order("created_at", Direction::Desc)
            .page(page, per_page);
        empty_if_missing(TABLE, self.client.select(self.caller, TABLE, &query).await)
    }

    /// Number of submissions with `status`. A missing table counts as zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self, status: ContactStatus) -> Result<u64, RepositoryError> {
        let query = Query::new().eq("status", status);
        match self.client.count(self.caller, TABLE, &query).await {
            Ok(count) => Ok(count),
            Err(e) if e.is_missing_table() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Change a submission's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no submission has this id.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: ContactSubmissionId,
        status: ContactStatus,
    ) -> Result<ContactSubmission, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<ContactSubmission> = self
            .client
            .update(self.caller, TABLE, &query, &ContactStatusPatch { status })
            .await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    /// Delete a submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ContactSubmissionId) -> Result<(), RepositoryError> {
        let query = Query::new().eq("id", id);
        Ok(self.client.delete(self.caller, TABLE, &query).await?)
    }
}
