//! Business logic services for storefront.
//!
//! # Services
//!
//! - `admin_status` - Admin-status resolution with a time-limited cache
//! - `auth` - Sign-up, sign-in, token refresh and sign-out
//! - `cart` - Session cart storage and pricing
//! - `checkout` - Turning a cart into a completed order
//! - `downloads` - Download authorization and signed links
//! - `validation` - Form input rules

pub mod admin_status;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod downloads;
pub mod validation;

pub use admin_status::{AdminStatus, AdminStatusCache};
pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutService};
pub use downloads::{DownloadError, DownloadService};
pub use validation::ValidationError;
