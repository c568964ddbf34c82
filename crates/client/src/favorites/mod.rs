//! Favorites store: per-user profile documents.
//!
//! One document per uid in the users collection:
//!
//! ```json
//! {
//!   "allergies": ["peanuts"],
//!   "favoriteRecipes": ["r7", "r9"],
//!   "savedRecipes": { "r7": { "id": "r7", "title": "Soup" }, "r9": { ... } }
//! }
//! ```
//!
//! The document is created lazily by the first allergy save or favorite
//! toggle and never deleted here.
//!
//! Toggling reads the document and then writes; it is not a transaction.
//! Two concurrent toggles of the same recipe can both see "not favorited".
//! The ID list stays duplicate-free through array-union, while the cache
//! entry ends up as whichever write landed last.

mod view;

pub use view::{FavoritesState, FavoritesView, LoadTicket, LoadedFavorites};

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sss_core::{Recipe, RecipeId, Uid, UserProfile, fields};
use tracing::{debug, info, instrument};

use crate::error::add_breadcrumb;
use crate::store::{Document, DocumentStore, DocumentUpdate, FieldPath, StoreError};

/// Reads and writes user profiles through a [`DocumentStore`].
#[derive(Clone)]
pub struct FavoritesStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl FavoritesStore {
    /// Create a favorites store over `collection`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Load a user's profile. A user without a document gets the empty
    /// profile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store fails or the document is not a
    /// valid profile.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn get_user_profile(&self, uid: &Uid) -> Result<UserProfile, StoreError> {
        let Some(doc) = self.store.get(&self.collection, uid.as_str()).await? else {
            debug!("No profile document; using empty profile");
            return Ok(UserProfile::default());
        };

        serde_json::from_value(Value::Object(doc))
            .map_err(|e| StoreError::Codec(format!("profile {uid}: {e}")))
    }

    /// Replace a user's allergies, creating the profile if needed.
    ///
    /// Entries are trimmed, blanks dropped, and duplicates (ignoring case)
    /// removed. Returns the list as saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store fails.
    #[instrument(skip(self, allergies), fields(uid = %uid))]
    pub async fn save_allergies<S: AsRef<str>>(
        &self,
        uid: &Uid,
        allergies: &[S],
    ) -> Result<Vec<String>, StoreError> {
        let allergies = normalize_allergies(allergies);
        let exists = self
            .store
            .get(&self.collection, uid.as_str())
            .await?
            .is_some();

        if exists {
            let update = DocumentUpdate::new().set(
                FieldPath::field(fields::ALLERGIES),
                Value::from(allergies.clone()),
            );
            self.store
                .update(&self.collection, uid.as_str(), update)
                .await?;
        } else {
            let profile = UserProfile::with_allergies(allergies.clone());
            self.store
                .set(&self.collection, uid.as_str(), to_document(&profile)?)
                .await?;
        }

        info!(count = allergies.len(), created = !exists, "Saved allergies");
        Ok(allergies)
    }

    /// Flip whether `recipe_id` is a favorite.
    ///
    /// Favoriting caches `recipe` under `recipe_id`; unfavoriting removes the
    /// ID and its cache entry in one update. Returns the new state: `true`
    /// if the recipe is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store fails. Nothing is written in that
    /// case.
    #[instrument(skip(self, recipe), fields(uid = %uid, recipe_id = %recipe_id))]
    pub async fn toggle_favorite_recipe(
        &self,
        uid: &Uid,
        recipe_id: &RecipeId,
        recipe: &Recipe,
    ) -> Result<bool, StoreError> {
        let Some(doc) = self.store.get(&self.collection, uid.as_str()).await? else {
            let profile = UserProfile::with_first_favorite(recipe_id.clone(), recipe.clone());
            self.store
                .set(&self.collection, uid.as_str(), to_document(&profile)?)
                .await?;
            record_toggle(recipe_id, true);
            return Ok(true);
        };

        let ids_path = FieldPath::field(fields::FAVORITE_RECIPES);
        let cache_path = FieldPath::field(fields::SAVED_RECIPES).child(recipe_id.as_str());
        let id_value = Value::String(recipe_id.to_string());

        let favorited = is_listed(&doc, recipe_id);
        let update = if favorited {
            DocumentUpdate::new()
                .array_remove(ids_path, vec![id_value])
                .delete(cache_path)
        } else {
            DocumentUpdate::new()
                .array_union(ids_path, vec![id_value])
                .set(cache_path, to_value(recipe)?)
        };

        self.store
            .update(&self.collection, uid.as_str(), update)
            .await?;
        record_toggle(recipe_id, !favorited);
        Ok(!favorited)
    }

    /// A user's cached favorite recipes, in favorites order.
    ///
    /// IDs with no cache entry are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the profile cannot be loaded.
    pub async fn get_favorite_recipes(&self, uid: &Uid) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.get_user_profile(uid).await?.favorite_recipes())
    }
}

/// Trim, drop blanks, and de-duplicate case-insensitively, keeping the first
/// spelling seen.
pub fn normalize_allergies<S: AsRef<str>>(allergies: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    allergies
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty() && seen.insert(a.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

/// Membership as stored, read straight from the raw list so a malformed
/// sibling entry cannot block the toggle.
fn is_listed(doc: &Document, recipe_id: &RecipeId) -> bool {
    doc.get(fields::FAVORITE_RECIPES)
        .and_then(Value::as_array)
        .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(recipe_id.as_str())))
}

fn record_toggle(recipe_id: &RecipeId, favorited: bool) {
    info!(favorited, "Toggled favorite");
    add_breadcrumb(
        "favorites",
        if favorited {
            "Added favorite"
        } else {
            "Removed favorite"
        },
        Some(&[("recipe_id", recipe_id.as_str())]),
    );
}

fn to_value(value: &impl Serialize) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Codec(e.to_string()))
}

fn to_document(profile: &UserProfile) -> Result<Document, StoreError> {
    match to_value(profile)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Codec(format!(
            "profile serialized to non-object: {other}"
        ))),
    }
}
