//! Unified error handling with Sentry integration.
//!
//! Library operations return their own error enums. Front ends convert them
//! into [`AppError`] and call [`AppError::capture`] before reporting to the
//! user, so backend failures reach Sentry and user mistakes do not.

use thiserror::Error;

use crate::config::ConfigError;
use crate::identity::ProviderError;
use crate::session::AuthError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Identity provider could not be reached or set up.
    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error is a backend fault worth reporting, as opposed to
    /// something the user can fix.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Storage(_) | Self::Provider(_) | Self::Internal(_)
        )
    }

    /// Report server errors to Sentry and log them. Returns `self` so it can
    /// sit in an error path: `Err(AppError::from(e).capture())`.
    #[must_use]
    pub fn capture(self) -> Self {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::debug!(error = %self, "Operation rejected");
        }
        self
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// The session manager calls this whenever the active identity changes.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("favorites", "Toggled favorite", Some(&[("recipe_id", "r7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("recipe file has no id".to_string());
        assert_eq!(err.to_string(), "Bad request: recipe file has no id");

        let err = AppError::from(StoreError::PermissionDenied("rules".to_string()));
        assert_eq!(err.to_string(), "Store error: Permission denied: rules");
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::from(StoreError::Codec("bad".to_string())).is_server_error());
        assert!(AppError::Internal("boom".to_string()).is_server_error());
        assert!(!AppError::BadRequest("nope".to_string()).is_server_error());
        assert!(!AppError::from(AuthError::InvalidDisplayName).is_server_error());
        assert!(!AppError::from(ConfigError::NoDataDir).is_server_error());
    }

    #[test]
    fn test_capture_without_client_is_harmless() {
        let err = AppError::Internal("boom".to_string()).capture();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
