//! Document store port and adapters.
//!
//! # Architecture
//!
//! - [`DocumentStore`] is the only surface the favorites logic consumes
//! - Documents are JSON objects addressed by `(collection, key)`
//! - Partial updates name fields by [`FieldPath`] and carry array-union /
//!   array-remove markers so list membership changes without a full rewrite
//!
//! # Adapters
//!
//! - [`MemoryDocumentStore`] - process-local, used by tests and offline runs
//! - [`FirestoreStore`] - Firestore REST v1

mod firestore;
mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryDocumentStore;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Errors that can occur when talking to a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update targeted a document that does not exist.
    #[error("Document not found: {collection}/{key}")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Document key.
        key: String,
    },

    /// Caller is not allowed to read or write the document.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store answered with a non-success status.
    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the store.
        message: String,
    },

    /// Document contents could not be encoded or decoded.
    #[error("Invalid document: {0}")]
    Codec(String),

    /// Update is malformed (empty, or overlapping field paths).
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Adapter could not be built from its configuration.
    #[error("Invalid store configuration: {0}")]
    Config(String),
}

/// A dotted path to a (possibly nested) document field.
///
/// Segments are kept separate, so a map key containing `.` (a recipe ID, for
/// instance) is still a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// A top-level field.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Extend the path by one nested segment.
    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Path segments from outermost to innermost.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// One change applied to one field by [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field, creating intermediate maps as needed.
    Set(Value),
    /// Remove the field. Removing a missing field is a no-op.
    Delete,
    /// Append each value not already present. A non-array field is replaced.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value. A non-array field becomes `[]`.
    ArrayRemove(Vec<Value>),
}

/// A set of field changes applied to one document in a single write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    ops: Vec<(FieldPath, FieldUpdate)>,
}

impl DocumentUpdate {
    /// An empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a field.
    #[must_use]
    pub fn set(mut self, path: FieldPath, value: Value) -> Self {
        self.ops.push((path, FieldUpdate::Set(value)));
        self
    }

    /// Delete a field.
    #[must_use]
    pub fn delete(mut self, path: FieldPath) -> Self {
        self.ops.push((path, FieldUpdate::Delete));
        self
    }

    /// Add values to an array field (set semantics).
    #[must_use]
    pub fn array_union(mut self, path: FieldPath, values: Vec<Value>) -> Self {
        self.ops.push((path, FieldUpdate::ArrayUnion(values)));
        self
    }

    /// Remove values from an array field (set semantics).
    #[must_use]
    pub fn array_remove(mut self, path: FieldPath, values: Vec<Value>) -> Self {
        self.ops.push((path, FieldUpdate::ArrayRemove(values)));
        self
    }

    /// The changes in insertion order.
    #[must_use]
    pub fn ops(&self) -> &[(FieldPath, FieldUpdate)] {
        &self.ops
    }

    /// Reject empty updates and updates that touch the same field twice
    /// (directly or through a parent), which no store can apply atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidUpdate` describing the first problem found.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.ops.is_empty() {
            return Err(StoreError::InvalidUpdate("no fields to update".to_owned()));
        }

        for (i, (path, _)) in self.ops.iter().enumerate() {
            if path.segments().iter().any(String::is_empty) {
                return Err(StoreError::InvalidUpdate(format!(
                    "empty segment in field path '{path}'"
                )));
            }
            for (other, _) in self.ops.iter().skip(i + 1) {
                if path.is_prefix_of(other) || other.is_prefix_of(path) {
                    return Err(StoreError::InvalidUpdate(format!(
                        "field paths '{path}' and '{other}' overlap"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Keyed JSON document storage.
///
/// Implementations must apply every change of one [`DocumentUpdate`]
/// together, or none of them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. A missing document is `Ok(None)`, not an error.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Create or fully overwrite a document.
    async fn set(&self, collection: &str, key: &str, value: Document) -> Result<(), StoreError>;

    /// Apply field changes to an existing document.
    ///
    /// Fails with `StoreError::NotFound` if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError>;
}

/// Write `value` at `path` inside `doc`, replacing non-object parents.
pub(crate) fn set_at(doc: &mut Document, path: &FieldPath, value: Value) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };

    let mut current = doc;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Some(map) = slot.as_object_mut() else {
            return;
        };
        current = map;
    }
    current.insert(last.clone(), value);
}

/// Remove the field at `path`, if every parent exists.
pub(crate) fn remove_at(doc: &mut Document, path: &FieldPath) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let parent = parents
        .iter()
        .try_fold(doc, |map, segment| map.get_mut(segment)?.as_object_mut())?;
    parent.remove(last)
}

/// Borrow the field at `path`, if present.
pub(crate) fn get_at<'a>(doc: &'a Document, path: &FieldPath) -> Option<&'a Value> {
    let (last, parents) = path.segments().split_last()?;
    let parent = parents
        .iter()
        .try_fold(doc, |map, segment| map.get(segment)?.as_object())?;
    parent.get(last)
}
