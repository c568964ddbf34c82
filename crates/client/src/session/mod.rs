//! Session manager: who is using the app.
//!
//! Combines the identity provider's auth state with an optional guest
//! session kept in local storage, and publishes the result as a
//! [`SessionSnapshot`].
//!
//! # Rules
//!
//! - A provider user always wins: when one arrives the guest session is
//!   dropped and its storage entry removed
//! - On start, a stored guest session is only restored if the provider has
//!   no signed-in user
//! - Sign-out clears the guest session too, whichever identity was active
//!
//! The manager is an owned value. Create it with [`SessionManager::init`],
//! hand clones of its snapshots or receivers to whatever needs them, and stop
//! it with [`SessionManager::dispose`] (or by dropping it).

mod error;
mod guest;

pub use error::AuthError;
pub use guest::GUEST_KEY;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use sss_core::{Email, GUEST_DISPLAY_NAME, GuestSession, Identity, ProviderUser, Uid};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::{FederatedCredential, IdentityProvider, ProviderState};
use crate::storage::LocalStorage;

/// Minimum password length accepted at sign-up.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Session state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Auth state last reported by the provider.
    pub provider: ProviderState,
    /// Active guest session, if any.
    pub guest: Option<GuestSession>,
}

impl SessionSnapshot {
    /// The active identity. A provider user supersedes a guest.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match &self.provider {
            ProviderState::SignedIn(user) => Some(Identity::Provider(user.clone())),
            ProviderState::Initializing | ProviderState::SignedOut => {
                self.guest.clone().map(Identity::Guest)
            }
        }
    }

    /// The uid keying the active identity's profile.
    #[must_use]
    pub fn uid(&self) -> Option<&Uid> {
        self.provider
            .user()
            .map(|user| &user.uid)
            .or_else(|| self.guest.as_ref().map(|guest| &guest.id))
    }

    /// Name to show for the active identity; guests are labelled "Guest".
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match (&self.provider, &self.guest) {
            (ProviderState::SignedIn(user), _) => user.display_name.as_deref(),
            (_, Some(_)) => Some(GUEST_DISPLAY_NAME),
            (_, None) => None,
        }
    }

    /// Whether any identity (provider or guest) is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.uid().is_some()
    }

    /// Whether a provider user is signed in.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.provider.user().is_some()
    }

    /// Whether the provider has yet to report its initial state.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.provider, ProviderState::Initializing)
    }
}

/// Owns the session state and keeps it in step with the identity provider.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    provider_state: watch::Receiver<ProviderState>,
    storage: Arc<dyn LocalStorage>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    listener: JoinHandle<()>,
}

impl SessionManager {
    /// Start a session manager.
    ///
    /// Restores a stored guest session unless the provider already reports a
    /// signed-in user, in which case the stored session is discarded. Then
    /// follows the provider's auth-state changes until disposed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(provider: Arc<dyn IdentityProvider>, storage: Arc<dyn LocalStorage>) -> Self {
        let mut provider_state = provider.subscribe();
        let initial = provider_state.borrow_and_update().clone();

        let guest = if initial.user().is_some() {
            guest::clear(storage.as_ref());
            None
        } else {
            guest::restore(storage.as_ref())
        };
        if let Some(guest) = &guest {
            info!(uid = %guest.id, "Restored guest session");
        }

        let (tx, _rx) = watch::channel(SessionSnapshot {
            provider: initial,
            guest,
        });
        let state = Arc::new(tx);
        sync_sentry_user(&state.borrow());

        let listener = tokio::spawn(follow_provider(
            provider_state.clone(),
            Arc::clone(&state),
            Arc::clone(&storage),
        ));

        Self {
            provider,
            provider_state,
            storage,
            state,
            listener,
        }
    }

    /// The active identity, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity()
    }

    /// The current session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Start a new guest session on this device.
    ///
    /// Each call generates a fresh guest ID, replacing any previous guest.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadySignedIn` if a provider user is signed in,
    /// or `AuthError::Storage` if the session cannot be persisted.
    #[instrument(skip(self))]
    pub fn continue_as_guest(&self) -> Result<GuestSession, AuthError> {
        if self.provider_signed_in() {
            return Err(AuthError::AlreadySignedIn);
        }

        let session = GuestSession::generate();
        guest::persist(self.storage.as_ref(), &session)?;

        // A sign-in reported while the record was being written must win.
        // Once the guest is in the snapshot, the listener evicts it instead.
        let accepted = self.state.send_if_modified(|snapshot| {
            if snapshot.is_logged_in() || self.provider_signed_in() {
                return false;
            }
            snapshot.guest = Some(session.clone());
            true
        });
        if !accepted {
            guest::clear(self.storage.as_ref());
            return Err(AuthError::AlreadySignedIn);
        }
        sync_sentry_user(&self.state.borrow());

        info!(uid = %session.id, "Continuing as guest");
        Ok(session)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, or the
    /// provider's error unchanged.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<ProviderUser, AuthError> {
        let email = Email::parse(email)?;
        let user = self.provider.sign_in_with_password(&email, password).await?;
        self.apply_provider_state();
        Ok(user)
    }

    /// Create an account, sign in as it, and set its display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword`, or
    /// `AuthError::InvalidDisplayName` before contacting the provider, or
    /// the provider's error unchanged.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        display_name: &str,
    ) -> Result<ProviderUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AuthError::InvalidDisplayName);
        }

        let user = self.provider.sign_up_with_password(&email, password).await?;
        // The account exists and is signed in even if naming it fails.
        let named = self.provider.set_display_name(&user, display_name).await;
        self.apply_provider_state();
        Ok(named?)
    }

    /// Sign in with a credential from a federated provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    #[instrument(skip(self, credential), fields(provider_id = %credential.provider_id))]
    pub async fn sign_in_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderUser, AuthError> {
        let user = self.provider.sign_in_with_federated(credential).await?;
        self.apply_provider_state();
        Ok(user)
    }

    /// Sign out of the provider, then clear any guest session.
    ///
    /// Safe to call when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged; the guest session is left in
    /// place in that case.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        self.apply_provider_state();

        guest::clear(self.storage.as_ref());
        self.state
            .send_if_modified(|snapshot| snapshot.guest.take().is_some());
        sync_sentry_user(&self.state.borrow());

        info!("Signed out");
        Ok(())
    }

    /// Stop following the provider. Dropping the manager does the same.
    pub fn dispose(self) {
        debug!("Session manager disposed");
    }

    /// Whether the provider has most recently reported a signed-in user,
    /// whether or not the listener has applied it yet.
    fn provider_signed_in(&self) -> bool {
        self.provider_state.borrow().user().is_some()
    }

    /// Apply the provider's current state now rather than waiting for the
    /// listener, so callers observe the result of their own sign-in.
    fn apply_provider_state(&self) {
        let provider = self.provider_state.borrow().clone();
        apply_provider_state(&self.state, self.storage.as_ref(), provider);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

async fn follow_provider(
    mut provider_state: watch::Receiver<ProviderState>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    storage: Arc<dyn LocalStorage>,
) {
    while provider_state.changed().await.is_ok() {
        let provider = provider_state.borrow_and_update().clone();
        apply_provider_state(&state, storage.as_ref(), provider);
    }
    debug!("Identity provider closed its auth-state channel");
}

/// Fold a provider state into the session. A signed-in user evicts the guest.
fn apply_provider_state(
    state: &watch::Sender<SessionSnapshot>,
    storage: &dyn LocalStorage,
    provider: ProviderState,
) {
    let signed_in = provider.user().is_some();
    let mut evicted = None;

    let changed = state.send_if_modified(|snapshot| {
        let mut changed = snapshot.provider != provider;
        snapshot.provider = provider;
        if signed_in {
            evicted = snapshot.guest.take();
            changed |= evicted.is_some();
        }
        changed
    });

    if signed_in {
        guest::clear(storage);
    }
    if let Some(guest) = evicted {
        info!(uid = %guest.id, "Provider sign-in replaced guest session");
    }
    if changed {
        sync_sentry_user(&state.borrow());
    }
}

fn sync_sentry_user(snapshot: &SessionSnapshot) {
    match &snapshot.provider {
        ProviderState::SignedIn(user) => {
            set_sentry_user(&user.uid, user.email.as_ref().map(Email::as_str));
        }
        ProviderState::Initializing | ProviderState::SignedOut => match &snapshot.guest {
            Some(guest) => set_sentry_user(&guest.id, None),
            None => clear_sentry_user(),
        },
    }
}
