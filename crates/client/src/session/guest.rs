//! Guest session persistence.

use serde::{Deserialize, Serialize};
use sss_core::{GuestSession, Uid};
use tracing::{debug, warn};

use crate::storage::{LocalStorage, StorageError};

/// Local storage key holding the guest session.
pub const GUEST_KEY: &str = "sss_guest_session";

/// Stored form: `{"type":"guest","id":"guest_..."}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StoredSession {
    Guest { id: Uid },
}

/// Load the stored guest session.
///
/// A record that does not parse is removed and reported as absent.
pub(super) fn restore(storage: &dyn LocalStorage) -> Option<GuestSession> {
    let raw = match storage.get(GUEST_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Could not read guest session");
            return None;
        }
    };

    match serde_json::from_str::<StoredSession>(&raw) {
        Ok(StoredSession::Guest { id }) => Some(GuestSession { id }),
        Err(e) => {
            warn!(error = %e, "Discarding corrupt guest session");
            clear(storage);
            None
        }
    }
}

pub(super) fn persist(storage: &dyn LocalStorage, session: &GuestSession) -> Result<(), StorageError> {
    let record = serde_json::to_string(&StoredSession::Guest {
        id: session.id.clone(),
    })?;
    storage.set(GUEST_KEY, &record)
}

/// Remove the stored guest session. Failures are logged, not raised.
pub(super) fn clear(storage: &dyn LocalStorage) {
    match storage.remove(GUEST_KEY) {
        Ok(()) => debug!("Cleared stored guest session"),
        Err(e) => warn!(error = %e, "Could not clear stored guest session"),
    }
}
