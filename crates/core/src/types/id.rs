//! Newtype IDs for type-safe entity references.
//!
//! Identifiers in this domain are opaque strings handed out by the identity
//! provider, generated locally for guests, or carried on recipe payloads.
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing a user ID with a recipe ID.

/// Errors that can occur when constructing an ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input is empty or whitespace only.
    #[error("id cannot be empty")]
    Empty,
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a plain string (validated on the way in)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Borrow<str>` so maps keyed by the ID can be queried with `&str`
///
/// # Example
///
/// ```rust
/// # use sss_core::define_id;
/// define_id!(ListId);
/// define_id!(ItemId);
///
/// let list_id = ListId::new("l1").unwrap();
/// let item_id = ItemId::new("l1").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: ListId = item_id;
/// # let _ = (list_id, item_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new ID, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns `IdError::Empty` if the input has no visible characters.
            pub fn new(id: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err($crate::IdError::Empty);
                }
                Ok(Self(id))
            }

            /// Wrap a string already known to be non-empty.
            #[allow(dead_code)]
            pub(crate) const fn new_unchecked(id: String) -> Self {
                Self(id)
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(id: String) -> ::core::result::Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::IdError;

            fn try_from(id: &str) -> ::core::result::Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

// Provider-issued or guest-generated user ID. Doubles as the profile document key.
define_id!(Uid);
define_id!(RecipeId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_new_rejects_blank() {
        assert_eq!(Uid::new(""), Err(IdError::Empty));
        assert_eq!(RecipeId::new("   "), Err(IdError::Empty));
    }

    #[test]
    fn test_new_keeps_input_verbatim() {
        let id = RecipeId::new(" r7").unwrap();
        assert_eq!(id.as_str(), " r7");
    }

    #[test]
    fn test_serde_is_plain_string() {
        let id = Uid::new("u1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");

        let parsed: Uid = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<RecipeId>("\"\"").is_err());
    }

    #[test]
    fn test_map_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(RecipeId::new("r7").unwrap(), 1);
        assert_eq!(map.get("r7"), Some(&1));
    }

    #[test]
    fn test_display_and_parse() {
        let id: RecipeId = "r9".parse().unwrap();
        assert_eq!(id.to_string(), "r9");
        assert_eq!(String::from(id), "r9");
    }
}
