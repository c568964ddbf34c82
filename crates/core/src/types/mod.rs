//! Core types for SSS.
//!
//! This module provides type-safe wrappers for the favorites domain.

pub mod email;
pub mod id;
pub mod identity;
pub mod profile;
pub mod recipe;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{GUEST_DISPLAY_NAME, GuestSession, Identity, ProviderUser};
pub use profile::{UserProfile, fields};
pub use recipe::Recipe;
