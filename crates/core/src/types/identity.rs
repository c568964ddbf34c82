//! Identity types: who is using the app.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Email, Uid};

/// Label shown for guest sessions.
pub const GUEST_DISPLAY_NAME: &str = "Guest";

/// Length of the random suffix on generated guest IDs.
const GUEST_SUFFIX_LENGTH: usize = 7;

/// A user known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// Provider-assigned user ID.
    pub uid: Uid,
    /// Email address, when the sign-in method has one.
    pub email: Option<Email>,
    /// Display name set at sign-up or by a federated provider.
    pub display_name: Option<String>,
}

/// A locally generated pseudo-identity used before sign-in.
///
/// Guest sessions only exist on the device that created them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSession {
    /// Generated guest ID (`guest_<unix millis>_<base36 suffix>`).
    pub id: Uid,
}

impl GuestSession {
    /// Generate a guest session with a fresh ID.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now(), &mut rand::rng())
    }

    /// Generate a guest session for the given instant and random source.
    ///
    /// The millisecond timestamp plus a 7-character base36 suffix makes a
    /// collision between two devices vanishingly unlikely.
    #[must_use]
    pub fn generate_at<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: String = (0..GUEST_SUFFIX_LENGTH)
            .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
            .collect();
        let id = format!("guest_{}_{suffix}", now.timestamp_millis());

        Self {
            id: Uid::new_unchecked(id),
        }
    }
}

/// The active principal.
///
/// At most one identity is active; a provider identity always supersedes a
/// guest session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Signed in with the identity provider.
    Provider(ProviderUser),
    /// Anonymous guest on this device.
    Guest(GuestSession),
}

impl Identity {
    /// The uid that keys this identity's profile document.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        match self {
            Self::Provider(user) => &user.uid,
            Self::Guest(guest) => &guest.id,
        }
    }

    /// The identity's own display name. Guests have none.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Provider(user) => user.display_name.as_deref(),
            Self::Guest(_) => None,
        }
    }

    /// Whether this identity is backed by the identity provider.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        match self {
            Self::Provider(_) => true,
            Self::Guest(_) => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_guest_id_format() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let guest = GuestSession::generate_at(now, &mut StdRng::seed_from_u64(7));

        let id = guest.id.as_str();
        let suffix = id.strip_prefix("guest_1700000000123_").unwrap();
        assert_eq!(suffix.len(), 7);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_guest_ids_differ_within_same_millisecond() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let a = GuestSession::generate_at(now, &mut rng);
        let b = GuestSession::generate_at(now, &mut rng);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_identity_accessors() {
        let user = ProviderUser {
            uid: Uid::new("u1").unwrap(),
            email: Some(Email::parse("cook@example.com").unwrap()),
            display_name: Some("Cook".to_owned()),
        };
        let provider = Identity::Provider(user);
        assert_eq!(provider.uid().as_str(), "u1");
        assert_eq!(provider.display_name(), Some("Cook"));
        assert!(provider.is_logged_in());

        let guest = Identity::Guest(GuestSession::generate());
        assert!(guest.uid().as_str().starts_with("guest_"));
        assert_eq!(guest.display_name(), None);
        assert!(!guest.is_logged_in());
    }
}
