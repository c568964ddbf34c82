//! User profile document.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Recipe, RecipeId};

/// Field names of the profile document as stored remotely.
pub mod fields {
    /// Allergy list.
    pub const ALLERGIES: &str = "allergies";

    /// Ordered favorite recipe IDs.
    pub const FAVORITE_RECIPES: &str = "favoriteRecipes";

    /// Recipe ID -> cached recipe payload.
    pub const SAVED_RECIPES: &str = "savedRecipes";
}

/// Per-user profile document, keyed by uid.
///
/// `saved_recipes` is a denormalized cache of the recipes in
/// `favorite_recipe_ids` so favorites can be listed without fetching recipe
/// detail. Every key of the cache should also be a favorited ID.
///
/// Missing or `null` fields deserialize to their empty value, so documents
/// written by older clients still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Free-text allergy names.
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergies: Vec<String>,
    /// Favorite recipe IDs in the order they were added.
    #[serde(
        rename = "favoriteRecipes",
        default,
        deserialize_with = "null_as_default"
    )]
    pub favorite_recipe_ids: Vec<RecipeId>,
    /// Cached recipe payloads keyed by recipe ID.
    #[serde(
        rename = "savedRecipes",
        default,
        deserialize_with = "null_as_default"
    )]
    pub saved_recipes: BTreeMap<RecipeId, Recipe>,
}

impl UserProfile {
    /// A new profile holding only the given allergies.
    #[must_use]
    pub fn with_allergies(allergies: Vec<String>) -> Self {
        Self {
            allergies,
            ..Self::default()
        }
    }

    /// A new profile whose only favorite is `recipe`, cached under `recipe_id`.
    #[must_use]
    pub fn with_first_favorite(recipe_id: RecipeId, recipe: Recipe) -> Self {
        Self {
            favorite_recipe_ids: vec![recipe_id.clone()],
            saved_recipes: BTreeMap::from([(recipe_id, recipe)]),
            ..Self::default()
        }
    }

    /// Cached payloads in favorites order.
    ///
    /// IDs without a cache entry are skipped; a partial write can leave one
    /// behind and it should not hide the rest of the list.
    #[must_use]
    pub fn favorite_recipes(&self) -> Vec<Recipe> {
        self.favorite_recipe_ids
            .iter()
            .filter_map(|id| self.saved_recipes.get(id))
            .cloned()
            .collect()
    }

    /// Cache entries whose ID is no longer favorited.
    pub fn orphaned_cache_entries(&self) -> impl Iterator<Item = &RecipeId> {
        self.saved_recipes
            .keys()
            .filter(|id| !self.favorite_recipe_ids.contains(id))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
