//! Core types for Template Shop.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! row shapes of the hosted backend tables.

pub mod email;
pub mod entities;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use entities::*;
pub use id::*;
pub use price::{Price, PriceError};
pub use slug::{is_valid_slug, slugify};
pub use status::*;
