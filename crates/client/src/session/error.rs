//! Session error types.

use thiserror::Error;

use crate::identity::ProviderError;
use crate::storage::StorageError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] sss_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name is blank.
    #[error("display name must not be blank")]
    InvalidDisplayName,

    /// A provider user is signed in, so a guest session cannot start.
    #[error("already signed in")]
    AlreadySignedIn,

    /// Identity provider error, passed through untranslated.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Guest session could not be persisted.
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),
}
