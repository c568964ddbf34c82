//! In-process identity provider.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sss_core::{Email, ProviderUser, Uid};
use tokio::sync::watch;
use tracing::debug;

use super::{FederatedCredential, IdentityProvider, ProviderError, ProviderState};

/// Minimum password length Firebase accepts.
const MIN_PASSWORD_LENGTH: usize = 6;

struct Account {
    user: ProviderUser,
    password: SecretString,
}

#[derive(Default)]
struct Accounts {
    /// Password accounts keyed by lowercased email.
    by_email: HashMap<String, Account>,
    /// Federated users keyed by (provider ID, ID token).
    federated: HashMap<(String, String), ProviderUser>,
    /// Error code returned by the next `sign_out` call.
    fail_next_sign_out: Option<String>,
}

/// Identity provider that keeps accounts in memory.
///
/// Rejects requests with the same error codes Firebase uses, so callers can
/// be exercised against realistic failures without a network.
pub struct MemoryIdentityProvider {
    accounts: Mutex<Accounts>,
    state: watch::Sender<ProviderState>,
    next_uid: AtomicU64,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    /// A provider that has already reported "signed out".
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(ProviderState::SignedOut)
    }

    /// A provider still restoring its session, as on app start.
    ///
    /// Call [`set_state`](Self::set_state) to finish.
    #[must_use]
    pub fn initializing() -> Self {
        Self::with_state(ProviderState::Initializing)
    }

    fn with_state(state: ProviderState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            accounts: Mutex::new(Accounts::default()),
            state: tx,
            next_uid: AtomicU64::new(1),
        }
    }

    /// Register a password account without signing in.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Rejected` with `EMAIL_EXISTS` if the email is
    /// already registered.
    pub fn add_user(
        &self,
        email: &Email,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderUser, ProviderError> {
        let user = ProviderUser {
            uid: self.generate_uid()?,
            email: Some(email.clone()),
            display_name: display_name.map(str::to_owned),
        };
        self.insert_account(email, SecretString::from(password), user.clone())?;
        Ok(user)
    }

    /// Accept `id_token` from `provider_id` as proof of `user`.
    pub fn add_federated_user(&self, provider_id: &str, id_token: &str, user: ProviderUser) {
        self.lock()
            .federated
            .insert((provider_id.to_owned(), id_token.to_owned()), user);
    }

    /// Make the next `sign_out` fail with the given error code.
    pub fn fail_next_sign_out(&self, code: &str) {
        self.lock().fail_next_sign_out = Some(code.to_owned());
    }

    /// Report an auth-state change that did not come from a call on this
    /// provider (session restored, token revoked, another tab signed in).
    pub fn set_state(&self, state: ProviderState) {
        self.state.send_replace(state);
    }

    /// The state last reported.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.state.borrow().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Accounts> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generate_uid(&self) -> Result<Uid, ProviderError> {
        let n = self.next_uid.fetch_add(1, Ordering::Relaxed);
        Uid::new(format!("mem_{n:06}")).map_err(|e| ProviderError::Response(e.to_string()))
    }

    fn insert_account(
        &self,
        email: &Email,
        password: SecretString,
        user: ProviderUser,
    ) -> Result<(), ProviderError> {
        let mut accounts = self.lock();
        let key = email.as_str().to_lowercase();
        if accounts.by_email.contains_key(&key) {
            return Err(ProviderError::Rejected("EMAIL_EXISTS".to_owned()));
        }
        accounts.by_email.insert(key, Account { user, password });
        Ok(())
    }

    fn signed_in(&self, user: ProviderUser) -> ProviderUser {
        debug!(uid = %user.uid, "memory provider signed in");
        self.state.send_replace(ProviderState::SignedIn(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<ProviderState> {
        self.state.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError> {
        let user = {
            let accounts = self.lock();
            accounts
                .by_email
                .get(&email.as_str().to_lowercase())
                .filter(|account| account.password.expose_secret() == password.expose_secret())
                .map(|account| account.user.clone())
                .ok_or_else(|| ProviderError::Rejected("INVALID_LOGIN_CREDENTIALS".to_owned()))?
        };
        Ok(self.signed_in(user))
    }

    async fn sign_up_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::Rejected(
                "WEAK_PASSWORD : Password should be at least 6 characters".to_owned(),
            ));
        }

        let user = ProviderUser {
            uid: self.generate_uid()?,
            email: Some(email.clone()),
            display_name: None,
        };
        self.insert_account(email, password.clone(), user.clone())?;
        Ok(self.signed_in(user))
    }

    async fn set_display_name(
        &self,
        user: &ProviderUser,
        display_name: &str,
    ) -> Result<ProviderUser, ProviderError> {
        if self.state.borrow().user().map(|u| &u.uid) != Some(&user.uid) {
            return Err(ProviderError::NotSignedIn);
        }

        let updated = ProviderUser {
            display_name: Some(display_name.to_owned()),
            ..user.clone()
        };
        {
            let mut accounts = self.lock();
            if let Some(account) = accounts
                .by_email
                .values_mut()
                .find(|account| account.user.uid == user.uid)
            {
                account.user = updated.clone();
            }
        }
        Ok(self.signed_in(updated))
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderUser, ProviderError> {
        if credential.id_token.expose_secret().is_empty() {
            return Err(ProviderError::Cancelled);
        }

        let user = self
            .lock()
            .federated
            .get(&(
                credential.provider_id.clone(),
                credential.id_token.expose_secret().to_owned(),
            ))
            .cloned()
            .ok_or_else(|| ProviderError::Rejected("INVALID_IDP_RESPONSE".to_owned()))?;
        Ok(self.signed_in(user))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(code) = self.lock().fail_next_sign_out.take() {
            return Err(ProviderError::Rejected(code));
        }
        self.state.send_replace(ProviderState::SignedOut);
        Ok(())
    }
}
