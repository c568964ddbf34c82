//! Integration tests for SSS.
//!
//! Tests drive the session manager and favorites store end to end against
//! the in-memory adapters, so they run without Firebase credentials.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sss-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `favorites` - profile documents, toggling, ordering
//! - `session` - guest lifecycle and provider hand-over
//! - `concurrency` - racing toggles

use std::sync::Arc;

use async_trait::async_trait;
use sss_client::FavoritesStore;
use sss_client::SessionManager;
use sss_client::identity::MemoryIdentityProvider;
use sss_client::storage::MemoryStorage;
use sss_client::store::{Document, DocumentStore, DocumentUpdate, MemoryDocumentStore, StoreError};
use sss_core::{Recipe, RecipeId, Uid};
use tokio::sync::{Barrier, mpsc, oneshot};

/// Collection used by every test.
pub const USERS: &str = "users";

/// In-memory adapters wired together.
pub struct TestContext {
    pub provider: Arc<MemoryIdentityProvider>,
    pub storage: Arc<MemoryStorage>,
    pub documents: Arc<MemoryDocumentStore>,
    pub favorites: FavoritesStore,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Fresh adapters with the provider signed out.
    #[must_use]
    pub fn new() -> Self {
        let documents = Arc::new(MemoryDocumentStore::new());
        Self {
            provider: Arc::new(MemoryIdentityProvider::new()),
            storage: Arc::new(MemoryStorage::new()),
            favorites: FavoritesStore::new(documents.clone(), USERS),
            documents,
        }
    }

    /// Start a session manager over this context's provider and storage.
    #[must_use]
    pub fn session(&self) -> SessionManager {
        SessionManager::init(self.provider.clone(), self.storage.clone())
    }

    /// The raw stored profile document.
    ///
    /// # Panics
    ///
    /// Panics if the store fails.
    #[allow(clippy::unwrap_used)]
    pub async fn raw_profile(&self, uid: &Uid) -> Option<serde_json::Value> {
        let doc = self.documents.get(USERS, uid.as_str()).await.unwrap();
        doc.map(serde_json::Value::Object)
    }
}

/// Parse a uid, panicking on blank input.
///
/// # Panics
///
/// Panics if `s` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn uid(s: &str) -> Uid {
    Uid::new(s).unwrap()
}

/// Parse a recipe ID, panicking on blank input.
///
/// # Panics
///
/// Panics if `s` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn rid(s: &str) -> RecipeId {
    RecipeId::new(s).unwrap()
}

/// A recipe with a title.
#[must_use]
pub fn recipe(id: &str, title: &str) -> Recipe {
    Recipe::new(rid(id)).with_field("title", title)
}

/// Store whose reads all rendezvous at a barrier before returning, so
/// concurrent read-then-write callers all read before any of them writes.
pub struct LockstepReads {
    inner: Arc<dyn DocumentStore>,
    barrier: Barrier,
}

impl LockstepReads {
    /// Wrap `inner`, releasing reads in groups of `readers`.
    #[must_use]
    pub fn new(inner: Arc<dyn DocumentStore>, readers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(readers),
        }
    }
}

#[async_trait]
impl DocumentStore for LockstepReads {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let doc = self.inner.get(collection, key).await?;
        self.barrier.wait().await;
        Ok(doc)
    }

    async fn set(&self, collection: &str, key: &str, value: Document) -> Result<(), StoreError> {
        self.inner.set(collection, key, value).await
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, key, update).await
    }
}

/// Store that parks every update until the test releases it.
///
/// Each parked update sends its release handle on the channel returned by
/// [`HeldUpdates::new`], in arrival order. Firing a handle lets that update
/// through; dropping it does the same.
pub struct HeldUpdates {
    inner: Arc<dyn DocumentStore>,
    arrivals: mpsc::UnboundedSender<oneshot::Sender<()>>,
}

impl HeldUpdates {
    /// Wrap `inner`, returning the store and the channel of release handles.
    #[must_use]
    pub fn new(
        inner: Arc<dyn DocumentStore>,
    ) -> (Self, mpsc::UnboundedReceiver<oneshot::Sender<()>>) {
        let (arrivals, rx) = mpsc::unbounded_channel();
        (Self { inner, arrivals }, rx)
    }
}

#[async_trait]
impl DocumentStore for HeldUpdates {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, value: Document) -> Result<(), StoreError> {
        self.inner.set(collection, key, value).await
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        let (release, held) = oneshot::channel();
        if self.arrivals.send(release).is_ok() {
            let _ = held.await;
        }
        self.inner.update(collection, key, update).await
    }
}

/// Store that denies every request, as security rules would for a stranger.
#[derive(Debug, Default)]
pub struct DenyingStore;

#[async_trait]
impl DocumentStore for DenyingStore {
    async fn get(&self, _collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::PermissionDenied(format!("read {key}")))
    }

    async fn set(&self, _collection: &str, key: &str, _value: Document) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied(format!("write {key}")))
    }

    async fn update(
        &self,
        _collection: &str,
        key: &str,
        _update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied(format!("write {key}")))
    }
}
