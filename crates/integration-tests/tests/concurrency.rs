//! Toggles racing on the same profile document.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use sss_client::FavoritesStore;
use sss_client::store::{DocumentStore, StoreError};
use sss_core::{Recipe, Uid, UserProfile};
use sss_integration_tests::{HeldUpdates, LockstepReads, TestContext, USERS, recipe, rid, uid};
use tokio::task::JoinHandle;

fn racing_store(ctx: &TestContext) -> FavoritesStore {
    let documents: Arc<dyn DocumentStore> = ctx.documents.clone();
    FavoritesStore::new(Arc::new(LockstepReads::new(documents, 2)), USERS)
}

#[tokio::test]
async fn test_racing_favorites_list_recipe_once() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    ctx.favorites.save_allergies(&u1, &["nuts"]).await.unwrap();

    let racing = racing_store(&ctx);
    let soup = recipe("r7", "Soup");
    let r7 = rid("r7");
    let (a, b) = tokio::join!(
        racing.toggle_favorite_recipe(&u1, &r7, &soup),
        racing.toggle_favorite_recipe(&u1, &r7, &soup),
    );

    // Both read "not favorited" before either wrote.
    assert!(a.unwrap());
    assert!(b.unwrap());

    let profile = ctx.favorites.get_user_profile(&u1).await.unwrap();
    assert_eq!(profile.favorite_recipe_ids, vec![rid("r7")]);
    assert_eq!(profile.favorite_recipes(), vec![soup]);
    assert_eq!(profile.allergies, vec!["nuts".to_owned()]);
}

#[tokio::test]
async fn test_racing_unfavorites_both_report_removed() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    let soup = recipe("r7", "Soup");
    let stew = recipe("r8", "Stew");
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r7"), &soup)
        .await
        .unwrap();
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r8"), &stew)
        .await
        .unwrap();

    let racing = racing_store(&ctx);
    let r7 = rid("r7");
    let (a, b) = tokio::join!(
        racing.toggle_favorite_recipe(&u1, &r7, &soup),
        racing.toggle_favorite_recipe(&u1, &r7, &soup),
    );
    assert!(!a.unwrap());
    assert!(!b.unwrap());

    let profile = ctx.favorites.get_user_profile(&u1).await.unwrap();
    assert_eq!(profile.favorite_recipe_ids, vec![rid("r8")]);
    assert_eq!(profile.orphaned_cache_entries().count(), 0);
    assert_eq!(profile.favorite_recipes(), vec![stew]);
}

#[tokio::test]
async fn test_different_recipes_race_without_losing_either() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    // Start from an existing document so both toggles take the update path.
    ctx.favorites.save_allergies(&u1, &[] as &[&str]).await.unwrap();

    let racing = racing_store(&ctx);
    let soup = recipe("r7", "Soup");
    let stew = recipe("r8", "Stew");
    let (r7, r8) = (rid("r7"), rid("r8"));
    let (a, b) = tokio::join!(
        racing.toggle_favorite_recipe(&u1, &r7, &soup),
        racing.toggle_favorite_recipe(&u1, &r8, &stew),
    );
    assert!(a.unwrap());
    assert!(b.unwrap());

    let mut listed = ctx
        .favorites
        .get_user_profile(&u1)
        .await
        .unwrap()
        .favorite_recipe_ids;
    listed.sort();
    assert_eq!(listed, vec![rid("r7"), rid("r8")]);
}

fn spawn_toggle(
    favorites: &FavoritesStore,
    uid: &Uid,
    recipe: &Recipe,
) -> JoinHandle<Result<bool, StoreError>> {
    let (favorites, uid, recipe) = (favorites.clone(), uid.clone(), recipe.clone());
    tokio::spawn(async move {
        favorites
            .toggle_favorite_recipe(&uid, &recipe.id, &recipe)
            .await
    })
}

/// Toggle A reads "not favorited", another client then favorites the recipe,
/// toggle B reads "favorited", and the two held writes land in the given
/// order. Returns the final profile.
async fn favorite_races_unfavorite(unfavorite_lands_first: bool) -> UserProfile {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    let soup = recipe("r7", "Soup");
    ctx.favorites.save_allergies(&u1, &["nuts"]).await.unwrap();

    let documents: Arc<dyn DocumentStore> = ctx.documents.clone();
    let (held, mut arrivals) = HeldUpdates::new(documents);
    let racing = FavoritesStore::new(Arc::new(held), USERS);

    let favorite = spawn_toggle(&racing, &u1, &soup);
    let release_favorite = arrivals.recv().await.unwrap();

    assert!(
        ctx.favorites
            .toggle_favorite_recipe(&u1, &rid("r7"), &soup)
            .await
            .unwrap()
    );

    let unfavorite = spawn_toggle(&racing, &u1, &soup);
    let release_unfavorite = arrivals.recv().await.unwrap();

    if unfavorite_lands_first {
        release_unfavorite.send(()).unwrap();
        assert!(!unfavorite.await.unwrap().unwrap());
        release_favorite.send(()).unwrap();
        assert!(favorite.await.unwrap().unwrap());
    } else {
        release_favorite.send(()).unwrap();
        assert!(favorite.await.unwrap().unwrap());
        release_unfavorite.send(()).unwrap();
        assert!(!unfavorite.await.unwrap().unwrap());
    }

    ctx.favorites.get_user_profile(&u1).await.unwrap()
}

fn assert_list_and_cache_agree(profile: &UserProfile) {
    assert_eq!(profile.orphaned_cache_entries().count(), 0);
    for id in &profile.favorite_recipe_ids {
        assert!(profile.saved_recipes.contains_key(id), "{id} has no cache entry");
    }
}

#[tokio::test]
async fn test_favorite_landing_after_unfavorite_keeps_recipe() {
    let profile = favorite_races_unfavorite(true).await;

    assert_list_and_cache_agree(&profile);
    assert_eq!(profile.favorite_recipe_ids, vec![rid("r7")]);
    assert_eq!(profile.favorite_recipes(), vec![recipe("r7", "Soup")]);
}

#[tokio::test]
async fn test_unfavorite_landing_after_favorite_drops_recipe() {
    let profile = favorite_races_unfavorite(false).await;

    assert_list_and_cache_agree(&profile);
    assert!(profile.favorite_recipe_ids.is_empty());
    assert!(profile.saved_recipes.is_empty());
}
