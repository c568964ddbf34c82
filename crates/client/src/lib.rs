//! SSS Client - session manager and recipe favorites.
//!
//! # Architecture
//!
//! Logic is written against three ports, each with an in-memory adapter and
//! a production adapter:
//!
//! | Port | In-memory | Production |
//! |---|---|---|
//! | [`identity::IdentityProvider`] | [`identity::MemoryIdentityProvider`] | [`identity::FirebaseAuthProvider`] |
//! | [`store::DocumentStore`] | [`store::MemoryDocumentStore`] | [`store::FirestoreStore`] |
//! | [`storage::LocalStorage`] | [`storage::MemoryStorage`] | [`storage::FileStorage`] |
//!
//! On top of them:
//!
//! - [`session::SessionManager`] - the active identity (provider user or guest)
//! - [`favorites::FavoritesStore`] - profile, allergies, and favorite recipes
//! - [`favorites::FavoritesView`] - state for a favorites screen
//!
//! # Example
//!
//! ```rust,ignore
//! let session = SessionManager::init(provider, storage);
//! let guest = session.continue_as_guest()?;
//! let favorites = FavoritesStore::new(store, "users");
//! let now_favorite = favorites.toggle_favorite_recipe(&guest.id, &recipe.id, &recipe).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod favorites;
pub mod identity;
pub mod session;
pub mod storage;
pub mod store;
pub mod telemetry;

mod rest;

pub use config::{ClientConfig, ConfigError, FirebaseConfig};
pub use error::{AppError, Result};
pub use favorites::{FavoritesState, FavoritesStore, FavoritesView};
pub use session::{AuthError, SessionManager, SessionSnapshot};
