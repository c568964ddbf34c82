//! SSS Core - Shared domain types.
//!
//! This crate provides the types shared by every SSS component:
//! - `client` - Session manager, favorites store, and backend adapters
//! - `cli` - Command-line driver for the client library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no document store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, recipes, user profiles, and identities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
