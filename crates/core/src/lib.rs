//! Template Shop Core - Shared types library.
//!
//! This crate provides common types used across all Template Shop components:
//! - `storefront` - Public storefront API and admin back-office
//! - `cli` - Command-line tools for backend checks, roles and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. The hosted
//! backend is the system of record; these types describe the shape of its rows.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses, entity rows and slugs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
