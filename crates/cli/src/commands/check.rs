//! Configuration and connectivity check.
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Project URL of the hosted backend
//! - `BACKEND_ANON_KEY` - Anonymous API key
//! - `BACKEND_SERVICE_KEY` - Service-role key (optional here, required by
//!   `admin` and `seed`)

use tracing::info;

use super::{CommandError, connect};

/// Validate backend settings and ping the backend.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the backend does not
/// answer.
pub async fn run() -> Result<(), CommandError> {
    let (config, client) = connect(false)?;

    info!(url = %config.url, "Backend configuration loaded");
    if config.service_key().is_some() {
        info!("Service key configured");
    } else {
        info!("Service key not configured; admin and seed commands will refuse to run");
    }

    client.ping().await?;
    info!("Backend reachable");
    Ok(())
}
