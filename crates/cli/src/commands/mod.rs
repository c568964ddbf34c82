//! Command implementations.

pub mod favorites;
pub mod session;

use std::io::BufRead;
use std::sync::Arc;

use secrecy::SecretString;
use sss_client::identity::{FirebaseAuthProvider, TokenSource};
use sss_client::storage::FileStorage;
use sss_client::store::FirestoreStore;
use sss_client::{AppError, ClientConfig, FavoritesStore, Result, SessionManager};
use sss_core::Uid;

/// Environment variable holding the password for `--email`.
const PASSWORD_ENV: &str = "SSS_PASSWORD";

/// Wired-up client components for one CLI run.
pub struct Context {
    pub session: SessionManager,
    pub favorites: FavoritesStore,
}

impl Context {
    /// Build Firebase adapters and a file-backed session from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if an HTTP client cannot be built.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let auth = Arc::new(FirebaseAuthProvider::new(&config.firebase)?);
        let tokens: Arc<dyn TokenSource> = auth.clone();
        let store = FirestoreStore::new(&config.firebase, Some(tokens))?;
        let storage = Arc::new(FileStorage::new(&config.storage_path));

        tracing::debug!(storage = %config.storage_path.display(), "Client components ready");
        Ok(Self {
            session: SessionManager::init(auth, storage),
            favorites: FavoritesStore::new(Arc::new(store), config.users_collection.clone()),
        })
    }

    /// Sign in with `email` if given.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the password cannot be read or sign-in fails.
    pub async fn sign_in(&self, email: Option<&str>) -> Result<()> {
        if let Some(email) = email {
            let password = read_password()?;
            let user = self.session.sign_in(email, &password).await?;
            tracing::info!(uid = %user.uid, "Signed in");
        }
        Ok(())
    }

    /// The uid data commands act as: the signed-in user, else the stored
    /// guest, else a new guest.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if sign-in fails or a guest cannot be created.
    pub async fn active_uid(&self, email: Option<&str>) -> Result<Uid> {
        self.sign_in(email).await?;
        if let Some(identity) = self.session.current_identity() {
            return Ok(identity.uid().clone());
        }
        let guest = self.session.continue_as_guest()?;
        Ok(guest.id)
    }
}

/// Read the password from `SSS_PASSWORD`, or the first line of stdin.
fn read_password() -> Result<SecretString> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AppError::Internal(format!("could not read password: {e}")))?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(AppError::BadRequest(format!(
            "no password given; set {PASSWORD_ENV} or pipe it on stdin"
        )));
    }
    Ok(SecretString::from(password.to_owned()))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(format!("could not render output: {e}")))?;
    print_line(&rendered);
    Ok(())
}

/// Print one line of command output.
pub fn print_line(line: &str) {
    #[allow(clippy::print_stdout)]
    {
        println!("{line}");
    }
}
