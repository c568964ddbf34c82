//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SSS_FIREBASE_API_KEY` - Web API key of the Firebase project
//! - `SSS_FIREBASE_PROJECT_ID` - Firebase project ID (Firestore lives under it)
//!
//! ## Optional
//! - `SSS_USERS_COLLECTION` - Collection holding profile documents (default: users)
//! - `SSS_STORAGE_PATH` - Local storage file (default: `<data dir>/sss/local_storage.json`)
//! - `SSS_IDENTITY_ENDPOINT` - Identity Toolkit base URL
//! - `SSS_FIRESTORE_ENDPOINT` - Firestore REST base URL
//! - `SSS_FIRESTORE_DATABASE` - Firestore database ID (default: (default))
//! - `SSS_HTTP_TIMEOUT_SECS` - Request timeout for both APIs (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("No local data directory; set SSS_STORAGE_PATH")]
    NoDataDir,
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Firebase project settings
    pub firebase: FirebaseConfig,
    /// Collection holding one profile document per uid
    pub users_collection: String,
    /// File backing local storage (guest session)
    pub storage_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Firebase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Web API key
    pub api_key: SecretString,
    /// Project ID
    pub project_id: String,
    /// Firestore database ID
    pub database: String,
    /// Identity Toolkit base URL
    pub identity_endpoint: Url,
    /// Firestore REST base URL
    pub firestore_endpoint: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("identity_endpoint", &self.identity_endpoint.as_str())
            .field("firestore_endpoint", &self.firestore_endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let firebase = FirebaseConfig::from_env()?;
        let users_collection = get_env_or_default("SSS_USERS_COLLECTION", "users");
        if users_collection.is_empty() || users_collection.contains('/') {
            return Err(ConfigError::InvalidEnvVar(
                "SSS_USERS_COLLECTION".to_string(),
                "must be a single non-empty path segment".to_string(),
            ));
        }

        let storage_path = match get_optional_env("SSS_STORAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_storage_path()?,
        };

        Ok(Self {
            firebase,
            users_collection,
            storage_path,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl FirebaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("SSS_HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SSS_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_key: get_validated_secret("SSS_FIREBASE_API_KEY")?,
            project_id: get_required_env("SSS_FIREBASE_PROJECT_ID")?,
            database: get_env_or_default("SSS_FIRESTORE_DATABASE", "(default)"),
            identity_endpoint: get_url("SSS_IDENTITY_ENDPOINT", DEFAULT_IDENTITY_ENDPOINT)?,
            firestore_endpoint: get_url("SSS_FIRESTORE_ENDPOINT", DEFAULT_FIRESTORE_ENDPOINT)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The API key, for building request URLs.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a base URL, normalized to end without a trailing slash.
fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = get_env_or_default(key, default);
    parse_base_url(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    Ok(url)
}

/// Default location of the local storage file.
fn default_storage_path() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("sss").join("local_storage.json"))
        .ok_or(ConfigError::NoDataDir)
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "is empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret(&value, key)?;
    Ok(SecretString::from(value))
}
