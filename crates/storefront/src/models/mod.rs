//! Domain models for storefront.
//!
//! Row types live in `template_shop_core`; this module holds state that
//! belongs to the HTTP session.

pub mod session;

pub use session::{Cart, CurrentUser};
