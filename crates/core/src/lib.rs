//! Thrift store core - shared types library.
//!
//! This crate provides common types used across the workspace:
//! - `server` - Back office, staff tools and storefront API
//! - `cli` - Command-line tools for migrations, seeding and staff accounts
//!
//! # Architecture
//!
//! The core crate contains only types and their validation rules - no I/O,
//! no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, phone numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
