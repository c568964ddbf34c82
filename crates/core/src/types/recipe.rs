//! Recipe payload type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RecipeId;

/// A recipe as produced by the recipe generator.
///
/// Only `id` is interpreted here. Every other field (title, ingredients,
/// steps, nutrition, ...) is carried verbatim so that a cached copy in a
/// profile renders exactly like the recipe it was saved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe identifier.
    pub id: RecipeId,
    /// Display fields, opaque to the favorites logic.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Recipe {
    /// Create a recipe with no display fields.
    #[must_use]
    pub fn new(id: RecipeId) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Add or replace a display field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a display field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The recipe title, if the payload carries one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "id": "r7",
            "title": "Soup",
            "ingredients": ["water", "salt"],
            "minutes": 20
        });

        let recipe: Recipe = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(recipe.id.as_str(), "r7");
        assert_eq!(recipe.title(), Some("Soup"));
        assert_eq!(recipe.field("minutes"), Some(&json!(20)));
        assert_eq!(serde_json::to_value(&recipe).unwrap(), raw);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<Recipe>(json!({"title": "Soup"})).is_err());
    }

    #[test]
    fn test_builder() {
        let recipe = Recipe::new(RecipeId::new("r1").unwrap()).with_field("title", "Stew");
        assert_eq!(recipe.title(), Some("Stew"));
        assert!(recipe.field("steps").is_none());
    }
}
