//! Identity provider port and adapters.
//!
//! The provider owns the authenticated user's lifecycle. It reports every
//! auth-state change on a [`watch`] channel; dropping the receiver is the
//! unsubscribe.
//!
//! # Adapters
//!
//! - [`MemoryIdentityProvider`] - accounts held in memory, for tests and demos
//! - [`FirebaseAuthProvider`] - Firebase Authentication (Identity Toolkit REST)

mod firebase;
mod memory;

pub use firebase::FirebaseAuthProvider;
pub use memory::MemoryIdentityProvider;

use async_trait::async_trait;
use secrecy::SecretString;
use sss_core::{Email, ProviderUser};
use thiserror::Error;
use tokio::sync::watch;

/// Errors reported by an identity provider.
///
/// These reach callers untranslated: `Rejected` carries the provider's own
/// error code (`INVALID_LOGIN_CREDENTIALS`, `EMAIL_EXISTS`, ...).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider refused the request.
    #[error("{0}")]
    Rejected(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with something we could not understand.
    #[error("Unexpected provider response: {0}")]
    Response(String),

    /// User abandoned a federated sign-in.
    #[error("Sign-in was cancelled")]
    Cancelled,

    /// Operation needs a signed-in user and there is none.
    #[error("No user is signed in")]
    NotSignedIn,

    /// Adapter could not be built from its configuration.
    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// The provider's error code, without any trailing detail.
    ///
    /// Firebase appends detail after `" : "`
    /// (`WEAK_PASSWORD : Password should be at least 6 characters`).
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(
                message
                    .split_once(" : ")
                    .map_or(message.as_str(), |(code, _)| code),
            ),
            _ => None,
        }
    }
}

/// Auth state as last reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderState {
    /// The provider has not reported yet (restoring a persisted session).
    #[default]
    Initializing,
    /// Nobody is signed in.
    SignedOut,
    /// A user is signed in.
    SignedIn(ProviderUser),
}

impl ProviderState {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&ProviderUser> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Initializing | Self::SignedOut => None,
        }
    }
}

/// Proof of a sign-in completed with a federated identity provider.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct FederatedCredential {
    /// Provider ID, e.g. `google.com`.
    pub provider_id: String,
    /// ID token issued by that provider.
    pub id_token: SecretString,
}

impl std::fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider_id", &self.provider_id)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to auth-state changes. The receiver sees the current state
    /// immediately.
    fn subscribe(&self) -> watch::Receiver<ProviderState>;

    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError>;

    /// Create an account and sign in as it.
    async fn sign_up_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<ProviderUser, ProviderError>;

    /// Set the display name of a signed-in user, returning the updated user.
    async fn set_display_name(
        &self,
        user: &ProviderUser,
        display_name: &str,
    ) -> Result<ProviderUser, ProviderError>;

    /// Sign in with a credential from a federated provider.
    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderUser, ProviderError>;

    /// Sign out the current user. Signing out when signed out is a no-op.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Source of the signed-in user's ID token, for authorizing store requests.
pub trait TokenSource: Send + Sync {
    /// The current ID token, if a user is signed in.
    fn id_token(&self) -> Option<SecretString>;
}
