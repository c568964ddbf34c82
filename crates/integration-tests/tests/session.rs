//! Session lifecycle across the provider, local storage and favorites.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use sss_client::SessionSnapshot;
use sss_client::identity::{FederatedCredential, ProviderState};
use sss_client::session::GUEST_KEY;
use sss_client::storage::{FileStorage, LocalStorage};
use sss_core::{Email, Identity, ProviderUser};
use sss_integration_tests::{TestContext, recipe, rid, uid};
use tokio::sync::watch;

async fn wait_until(
    rx: &mut watch::Receiver<SessionSnapshot>,
    f: impl FnMut(&SessionSnapshot) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(f))
        .await
        .unwrap()
        .unwrap();
}

fn cook() -> ProviderUser {
    ProviderUser {
        uid: uid("u1"),
        email: Some(Email::parse("cook@sss.test").unwrap()),
        display_name: Some("Cook".to_owned()),
    }
}

#[tokio::test]
async fn test_provider_sign_in_from_elsewhere_clears_guest() {
    let ctx = TestContext::new();
    let session = ctx.session();
    let guest = session.continue_as_guest().unwrap();
    assert_eq!(session.current_identity(), Some(Identity::Guest(guest)));

    let mut rx = session.subscribe();
    ctx.provider.set_state(ProviderState::SignedIn(cook()));
    wait_until(&mut rx, SessionSnapshot::is_logged_in).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.guest, None);
    assert_eq!(snapshot.uid(), Some(&uid("u1")));
    assert_eq!(ctx.storage.get(GUEST_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_guest_after_sign_out_is_fresh() {
    let ctx = TestContext::new();
    let session = ctx.session();

    let first = session.continue_as_guest().unwrap();
    session.sign_out().await.unwrap();
    assert_eq!(session.current_identity(), None);

    let second = session.continue_as_guest().unwrap();
    assert_ne!(first.id, second.id);
    assert!(second.id.as_str().starts_with("guest_"));
}

#[tokio::test]
async fn test_guest_survives_restart_until_sign_out() {
    let ctx = TestContext::new();
    let guest = ctx.session().continue_as_guest().unwrap();

    let restarted = ctx.session();
    assert_eq!(restarted.snapshot().guest, Some(guest));
    assert_eq!(restarted.snapshot().display_name(), Some("Guest"));

    restarted.sign_out().await.unwrap();
    assert_eq!(ctx.session().current_identity(), None);
}

#[tokio::test]
async fn test_corrupt_guest_record_is_removed() {
    let ctx = TestContext::new();
    ctx.storage.set(GUEST_KEY, "{not json").unwrap();

    let session = ctx.session();
    assert_eq!(session.current_identity(), None);
    assert_eq!(ctx.storage.get(GUEST_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_wrong_record_shape_is_removed() {
    let ctx = TestContext::new();
    ctx.storage
        .set(GUEST_KEY, r#"{"type":"account","id":"u1"}"#)
        .unwrap();

    let session = ctx.session();
    assert_eq!(session.current_identity(), None);
    assert_eq!(ctx.storage.get(GUEST_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_stored_guest_discarded_when_already_signed_in() {
    let ctx = TestContext::new();
    ctx.session().continue_as_guest().unwrap();
    ctx.provider.set_state(ProviderState::SignedIn(cook()));

    let session = ctx.session();
    assert!(session.snapshot().is_logged_in());
    assert_eq!(session.snapshot().guest, None);
    assert_eq!(ctx.storage.get(GUEST_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_password_sign_in_replaces_guest() {
    let ctx = TestContext::new();
    let account = ctx
        .provider
        .add_user(&Email::parse("cook@sss.test").unwrap(), "hunter22", Some("Cook"))
        .unwrap();
    let session = ctx.session();
    session.continue_as_guest().unwrap();

    let user = session
        .sign_in("cook@sss.test", &SecretString::from("hunter22"))
        .await
        .unwrap();

    assert_eq!(user, account);
    assert_eq!(session.current_identity(), Some(Identity::Provider(account)));
    assert_eq!(ctx.storage.get(GUEST_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_federated_sign_in() {
    let ctx = TestContext::new();
    ctx.provider.add_federated_user("google.com", "id-token", cook());
    let session = ctx.session();

    let credential = FederatedCredential {
        provider_id: "google.com".to_owned(),
        id_token: SecretString::from("id-token"),
    };
    let user = session.sign_in_federated(&credential).await.unwrap();

    assert_eq!(user, cook());
    assert_eq!(session.snapshot().display_name(), Some("Cook"));

    let forged = FederatedCredential {
        provider_id: "google.com".to_owned(),
        id_token: SecretString::from("forged"),
    };
    let err = session.sign_in_federated(&forged).await.unwrap_err();
    assert_eq!(err.to_string(), "INVALID_IDP_RESPONSE");
}

#[tokio::test]
async fn test_guest_favorites_are_keyed_by_guest_id() {
    let ctx = TestContext::new();
    let session = ctx.session();
    let guest = session.continue_as_guest().unwrap();

    let active = session.current_identity().unwrap();
    ctx.favorites
        .toggle_favorite_recipe(active.uid(), &rid("r7"), &recipe("r7", "Soup"))
        .await
        .unwrap();

    let profile = ctx.favorites.get_user_profile(&guest.id).await.unwrap();
    assert_eq!(profile.favorite_recipe_ids, vec![rid("r7")]);

    // A later account starts with its own profile.
    session.sign_out().await.unwrap();
    let user = session
        .sign_up("cook@sss.test", &SecretString::from("hunter22"), "Cook")
        .await
        .unwrap();
    assert!(ctx.favorites.get_favorite_recipes(&user.uid).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_storage_keeps_guest_across_managers() {
    let path = std::env::temp_dir().join(format!(
        "sss-session-{}-{}.json",
        std::process::id(),
        line!()
    ));
    let ctx = TestContext::new();

    let guest = {
        let session = sss_client::SessionManager::init(
            ctx.provider.clone(),
            Arc::new(FileStorage::new(&path)),
        );
        session.continue_as_guest().unwrap()
    };

    let session =
        sss_client::SessionManager::init(ctx.provider.clone(), Arc::new(FileStorage::new(&path)));
    assert_eq!(session.snapshot().guest, Some(guest));

    session.sign_out().await.unwrap();
    assert_eq!(FileStorage::new(&path).get(GUEST_KEY).unwrap(), None);

    let _ = std::fs::remove_file(&path);
}
