//! Firebase Authentication over the Identity Toolkit REST API.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sss_core::{Email, ProviderUser, Uid};
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use url::Url;

use super::{FederatedCredential, IdentityProvider, ProviderError, ProviderState, TokenSource};
use crate::config::FirebaseConfig;
use crate::rest;

/// `accounts:*` response fields shared by sign-in, sign-up, and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

struct SignedInSession {
    user: ProviderUser,
    id_token: SecretString,
}

/// Firebase Authentication client.
///
/// Sessions live only in this process: the provider starts signed out and
/// signing out just forgets the ID token.
pub struct FirebaseAuthProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
    session: RwLock<Option<SignedInSession>>,
    state: watch::Sender<ProviderState>,
}

impl FirebaseAuthProvider {
    /// Create a Firebase Authentication client.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` if the HTTP client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let (state, _rx) = watch::channel(ProviderState::SignedOut);

        Ok(Self {
            client,
            endpoint: config.identity_endpoint.clone(),
            api_key: config.api_key.clone(),
            session: RwLock::new(None),
            state,
        })
    }

    /// URL of an `accounts:<method>` endpoint.
    fn method_url(&self, method: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Config("endpoint cannot be a base URL".to_owned()))?
            .pop_if_empty()
            .push(&format!("accounts:{method}"));
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    /// POST a JSON body to `accounts:<method>`.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, ProviderError> {
        let url = self.method_url(method)?;
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = rest::error_message(&text);
            warn!(method, status = %status, error = %message, "Identity Toolkit rejected request");
            return Err(ProviderError::Rejected(message));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(method, body = %rest::excerpt(&text), "Unparseable Identity Toolkit response");
            ProviderError::Response(e.to_string())
        })
    }

    /// Record a successful sign-in and report it.
    fn establish(&self, response: AccountResponse) -> Result<ProviderUser, ProviderError> {
        let id_token = response
            .id_token
            .clone()
            .ok_or_else(|| ProviderError::Response("missing idToken".to_owned()))?;
        let user = user_from(response)?;

        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(SignedInSession {
            user: user.clone(),
            id_token: SecretString::from(id_token),
        });
        info!(uid = %user.uid, "Signed in with Firebase");
        self.state.send_replace(ProviderState::SignedIn(user.clone()));
        Ok(user)
    }

    fn current_token_for(&self, uid: &Uid) -> Option<SecretString> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|session| &session.user.uid == uid)
            .map(|session| session.id_token.clone())
    }
}

fn user_from(response: AccountResponse) -> Result<ProviderUser, ProviderError> {
    let uid = Uid::new(response.local_id).map_err(|e| ProviderError::Response(e.to_string()))?;
    Ok(ProviderUser {
        uid,
        // Federated accounts may carry addresses we don't consider valid; drop them.
        email: response.email.and_then(|e| Email::parse(&e).ok()),
        display_name: response.display_name.filter(|name| !name.trim().is_empty()),
    })
}

/// Body of `accounts:signInWithIdp` for an ID token from `provider_id`.
fn idp_body(credential: &FederatedCredential) -> Value {
    let post_body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token", credential.id_token.expose_secret())
        .append_pair("providerId", &credential.provider_id)
        .finish();

    json!({
        "postBody": post_body,
        "requestUri": "http://localhost",
        "returnIdpCredential": true,
        "returnSecureToken": true,
    })
}

#[async_trait]
impl IdentityProvider for FirebaseAuthProvider {
    fn subscribe(&self) -> watch::Receiver<ProviderState> {
        self.state.subscribe()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError> {
        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
            "returnSecureToken": true,
        });
        let response = self.call("signInWithPassword", &body).await?;
        self.establish(response)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError> {
        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
            "returnSecureToken": true,
        });
        let response = self.call("signUp", &body).await?;
        self.establish(response)
    }

    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn set_display_name(
        &self,
        user: &ProviderUser,
        display_name: &str,
    ) -> Result<ProviderUser, ProviderError> {
        let id_token = self
            .current_token_for(&user.uid)
            .ok_or(ProviderError::NotSignedIn)?;

        let body = json!({
            "idToken": id_token.expose_secret(),
            "displayName": display_name,
            "returnSecureToken": false,
        });
        let response: AccountResponse = self.call("update", &body).await?;
        let updated = ProviderUser {
            display_name: response
                .display_name
                .or_else(|| Some(display_name.to_owned())),
            ..user.clone()
        };

        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(session) = session.as_mut().filter(|s| s.user.uid == user.uid) {
                session.user = updated.clone();
            }
        }
        self.state.send_replace(ProviderState::SignedIn(updated.clone()));
        Ok(updated)
    }

    #[instrument(skip(self, credential), fields(provider_id = %credential.provider_id))]
    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderUser, ProviderError> {
        if credential.id_token.expose_secret().is_empty() {
            return Err(ProviderError::Cancelled);
        }
        let response = self.call("signInWithIdp", &idp_body(credential)).await?;
        self.establish(response)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = previous {
            info!(uid = %session.user.uid, "Signed out of Firebase");
        }
        self.state.send_replace(ProviderState::SignedOut);
        Ok(())
    }
}

impl TokenSource for FirebaseAuthProvider {
    fn id_token(&self) -> Option<SecretString> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.id_token.clone())
    }
}
