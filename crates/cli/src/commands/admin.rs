//! Administrator management commands.
//!
//! # Usage
//!
//! ```bash
//! ts-cli admin grant -e admin@example.com
//! ts-cli admin revoke -e admin@example.com
//! ```
//!
//! The account must already exist: users sign up through the storefront and
//! are promoted here.

use tracing::info;

use template_shop_core::{Email, UserRole};
use template_shop_storefront::backend::Caller;
use template_shop_storefront::db::ProfileRepository;

use super::{CommandError, connect};

/// Promote a user to administrator.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such user exists, or the
/// update fails.
pub async fn grant(email: &str) -> Result<(), CommandError> {
    set_role(email, UserRole::Admin).await
}

/// Demote an administrator to customer.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such user exists, or the
/// update fails.
pub async fn revoke(email: &str) -> Result<(), CommandError> {
    set_role(email, UserRole::Customer).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let (_, client) = connect(true)?;
    let profiles = ProfileRepository::new(&client, Caller::Service);

    let profile = profiles
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(email.to_string()))?;

    if profile.role == role {
        info!(%email, %role, "Role unchanged");
        return Ok(());
    }

    let updated = profiles.set_role(profile.id, role).await?;
    info!(
        %email,
        user_id = %updated.id,
        from = %profile.role,
        to = %updated.role,
        "Role updated"
    );
    Ok(())
}
