//! Firestore REST v1 document store.
//!
//! Reads use `GET .../documents/{collection}/{key}`, overwrites use `PATCH`
//! without an update mask, and partial updates go through `documents:commit`
//! so field writes and array transforms land in one atomic write guarded by
//! an `exists` precondition.

mod codec;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{Document, DocumentStore, DocumentUpdate, FieldUpdate, StoreError, set_at};
use crate::config::FirebaseConfig;
use crate::identity::TokenSource;
use crate::rest;

use codec::{decode_fields, encode_field_path, encode_fields, encode_value};

/// Document body returned by `GET`.
#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Client for Firestore's REST API.
///
/// Requests carry the project API key, plus the signed-in user's ID token
/// when a [`TokenSource`] is attached so security rules see the caller.
#[derive(Clone)]
pub struct FirestoreStore {
    inner: Arc<FirestoreStoreInner>,
}

struct FirestoreStoreInner {
    client: reqwest::Client,
    /// `{endpoint}/projects/{project}/databases/{database}`
    database_url: Url,
    /// `projects/{project}/databases/{database}/documents`
    document_root: String,
    api_key: SecretString,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl FirestoreStore {
    /// Create a Firestore client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if the HTTP client cannot be built, or
    /// `StoreError::Config` if the endpoint cannot hold a path.
    pub fn new(
        config: &FirebaseConfig,
        tokens: Option<Arc<dyn TokenSource>>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let mut database_url = config.firestore_endpoint.clone();
        database_url
            .path_segments_mut()
            .map_err(|()| StoreError::Config("endpoint cannot be a base URL".to_owned()))?
            .pop_if_empty()
            .extend(["projects", &config.project_id, "databases", &config.database]);

        Ok(Self {
            inner: Arc::new(FirestoreStoreInner {
                client,
                database_url,
                document_root: format!(
                    "projects/{}/databases/{}/documents",
                    config.project_id, config.database
                ),
                api_key: config.api_key.clone(),
                tokens,
            }),
        })
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.inner.database_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Config("endpoint cannot be a base URL".to_owned()))?
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    fn document_url(&self, collection: &str, key: &str) -> Result<Url, StoreError> {
        self.url_with(&["documents", collection, key])
    }

    fn commit_url(&self) -> Result<Url, StoreError> {
        self.url_with(&["documents:commit"])
    }

    fn document_name(&self, collection: &str, key: &str) -> String {
        format!("{}/{collection}/{key}", self.inner.document_root)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.tokens.as_ref().and_then(|t| t.id_token()) {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Build the single `Write` for a partial update.
    fn update_write(&self, collection: &str, key: &str, update: &DocumentUpdate) -> Value {
        let mut fields = Document::new();
        let mut mask = Vec::new();
        let mut transforms = Vec::new();

        for (path, op) in update.ops() {
            let encoded_path = encode_field_path(path);
            match op {
                FieldUpdate::Set(value) => {
                    set_at(&mut fields, path, value.clone());
                    mask.push(encoded_path);
                }
                // A masked path with no value deletes the field.
                FieldUpdate::Delete => mask.push(encoded_path),
                FieldUpdate::ArrayUnion(values) => transforms.push(json!({
                    "fieldPath": encoded_path,
                    "appendMissingElements": { "values": encode_all(values) },
                })),
                FieldUpdate::ArrayRemove(values) => transforms.push(json!({
                    "fieldPath": encoded_path,
                    "removeAllFromArray": { "values": encode_all(values) },
                })),
            }
        }

        // The mask is always sent: without one, `update` replaces the whole document.
        json!({
            "update": {
                "name": self.document_name(collection, key),
                "fields": encode_fields(&fields),
            },
            "updateMask": { "fieldPaths": mask },
            "updateTransforms": transforms,
            "currentDocument": { "exists": true },
        })
    }
}

fn encode_all(values: &[Value]) -> Vec<Value> {
    values.iter().map(encode_value).collect()
}

/// Map a non-success response onto a `StoreError`.
async fn error_from(response: Response, collection: &str, key: &str) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = rest::error_message(&body);

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound {
            collection: collection.to_owned(),
            key: key.to_owned(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied(message),
        _ => {
            tracing::error!(
                status = %status,
                body = %rest::excerpt(&body),
                "Firestore returned non-success status"
            );
            StoreError::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, key)?;
        let response = self.request(Method::GET, url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Document does not exist");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from(response, collection, key).await);
        }

        let document: FirestoreDocument = response.json().await?;
        decode_fields(&document.fields).map(Some)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, collection: &str, key: &str, value: Document) -> Result<(), StoreError> {
        let url = self.document_url(collection, key)?;
        let body = json!({ "fields": encode_fields(&value) });
        let response = self.request(Method::PATCH, url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response, collection, key).await);
        }
        debug!("Document written");
        Ok(())
    }

    #[instrument(skip(self, update), fields(ops = update.ops().len()))]
    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        update.validate()?;

        let url = self.commit_url()?;
        let body = json!({ "writes": [self.update_write(collection, key, &update)] });
        let response = self.request(Method::POST, url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response, collection, key).await);
        }
        debug!("Update committed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::super::FieldPath;
    use super::*;

    fn store() -> FirestoreStore {
        let config = FirebaseConfig {
            api_key: SecretString::from("AIzaTestKey123"),
            project_id: "sss-test".to_owned(),
            database: "(default)".to_owned(),
            identity_endpoint: Url::parse("https://identitytoolkit.googleapis.com/v1").unwrap(),
            firestore_endpoint: Url::parse("https://firestore.googleapis.com/v1").unwrap(),
            timeout: Duration::from_secs(5),
        };
        FirestoreStore::new(&config, None).unwrap()
    }

    #[test]
    fn test_document_url() {
        let url = store().document_url("users", "guest_1_abc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/sss-test/databases/(default)/documents/users/guest_1_abc?key=AIzaTestKey123"
        );
    }

    #[test]
    fn test_document_url_escapes_key() {
        let url = store().document_url("users", "a/b c").unwrap();
        assert!(url.path().ends_with("/documents/users/a%2Fb%20c"));
    }

    #[test]
    fn test_commit_url() {
        let url = store().commit_url().unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/sss-test/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn test_favorite_write() {
        let update = DocumentUpdate::new()
            .array_union(FieldPath::field("favoriteRecipes"), vec![json!("r7")])
            .set(
                FieldPath::field("savedRecipes").child("r7"),
                json!({"id": "r7", "title": "Soup"}),
            );

        let write = store().update_write("users", "u1", &update);
        assert_eq!(
            write,
            json!({
                "update": {
                    "name": "projects/sss-test/databases/(default)/documents/users/u1",
                    "fields": {"savedRecipes": {"mapValue": {"fields": {
                        "r7": {"mapValue": {"fields": {
                            "id": {"stringValue": "r7"},
                            "title": {"stringValue": "Soup"}
                        }}}
                    }}}}
                },
                "updateMask": {"fieldPaths": ["savedRecipes.r7"]},
                "updateTransforms": [{
                    "fieldPath": "favoriteRecipes",
                    "appendMissingElements": {"values": [{"stringValue": "r7"}]}
                }],
                "currentDocument": {"exists": true}
            })
        );
    }

    #[test]
    fn test_unfavorite_write_masks_deleted_entry() {
        let update = DocumentUpdate::new()
            .array_remove(FieldPath::field("favoriteRecipes"), vec![json!("r7")])
            .delete(FieldPath::field("savedRecipes").child("r7"));

        let write = store().update_write("users", "u1", &update);
        assert_eq!(write["update"]["fields"], json!({}));
        assert_eq!(write["updateMask"], json!({"fieldPaths": ["savedRecipes.r7"]}));
        assert_eq!(
            write["updateTransforms"][0]["removeAllFromArray"],
            json!({"values": [{"stringValue": "r7"}]})
        );
    }
}
