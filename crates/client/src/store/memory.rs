//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    Document, DocumentStore, DocumentUpdate, FieldPath, FieldUpdate, StoreError, get_at, remove_at,
    set_at,
};

/// Document store kept in memory.
///
/// Applies updates with the same field semantics as the Firestore adapter,
/// so logic tested against it behaves the same against the real backend.
/// All changes of one update happen under a single write lock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), Document>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(collection.to_owned(), key.to_owned()))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, value: Document) -> Result<(), StoreError> {
        debug!(collection, key, "set document");
        self.documents
            .write()
            .await
            .insert((collection.to_owned(), key.to_owned()), value);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        update.validate()?;

        let mut documents = self.documents.write().await;
        let Some(current) = documents.get(&(collection.to_owned(), key.to_owned())) else {
            return Err(StoreError::NotFound {
                collection: collection.to_owned(),
                key: key.to_owned(),
            });
        };

        // Build the new version first so a failure leaves the stored one untouched.
        let mut next = current.clone();
        for (path, op) in update.ops() {
            match op {
                FieldUpdate::Set(value) => set_at(&mut next, path, value.clone()),
                FieldUpdate::Delete => {
                    remove_at(&mut next, path);
                }
                FieldUpdate::ArrayUnion(values) => {
                    let mut items = existing_array(&next, path);
                    for value in values {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                    set_at(&mut next, path, Value::Array(items));
                }
                FieldUpdate::ArrayRemove(values) => {
                    let mut items = existing_array(&next, path);
                    items.retain(|item| !values.contains(item));
                    set_at(&mut next, path, Value::Array(items));
                }
            }
        }

        debug!(collection, key, ops = update.ops().len(), "updated document");
        documents.insert((collection.to_owned(), key.to_owned()), next);
        Ok(())
    }
}

fn existing_array(doc: &Document, path: &FieldPath) -> Vec<Value> {
    get_at(doc, path)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
