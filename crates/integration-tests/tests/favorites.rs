//! Favorites store behaviour end to end.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use sss_client::identity::ProviderState;
use sss_client::store::{DocumentStore, StoreError};
use sss_client::{FavoritesState, FavoritesStore, FavoritesView, SessionSnapshot};
use sss_core::{ProviderUser, UserProfile};
use sss_integration_tests::{DenyingStore, TestContext, USERS, recipe, rid, uid};

#[tokio::test]
async fn test_soup_round_trip() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    let soup = recipe("r7", "Soup");

    assert_eq!(
        ctx.favorites.get_user_profile(&u1).await.unwrap(),
        UserProfile::default()
    );

    assert!(ctx.favorites.toggle_favorite_recipe(&u1, &rid("r7"), &soup).await.unwrap());
    assert_eq!(
        ctx.favorites.get_favorite_recipes(&u1).await.unwrap(),
        vec![soup.clone()]
    );
    assert_eq!(
        serde_json::to_value(&ctx.favorites.get_favorite_recipes(&u1).await.unwrap()).unwrap(),
        json!([{"id": "r7", "title": "Soup"}])
    );

    assert!(!ctx.favorites.toggle_favorite_recipe(&u1, &rid("r7"), &soup).await.unwrap());
    assert!(ctx.favorites.get_favorite_recipes(&u1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_toggle_alternates_from_either_start() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    let soup = recipe("r7", "Soup");
    let stew = recipe("r8", "Stew");

    // r7 starts favorited, r8 does not.
    ctx.favorites.toggle_favorite_recipe(&u1, &rid("r7"), &soup).await.unwrap();

    let r7: Vec<bool> = [
        ctx.favorites.toggle_favorite_recipe(&u1, &rid("r7"), &soup).await.unwrap(),
        ctx.favorites.toggle_favorite_recipe(&u1, &rid("r7"), &soup).await.unwrap(),
    ]
    .into();
    let r8: Vec<bool> = [
        ctx.favorites.toggle_favorite_recipe(&u1, &rid("r8"), &stew).await.unwrap(),
        ctx.favorites.toggle_favorite_recipe(&u1, &rid("r8"), &stew).await.unwrap(),
    ]
    .into();

    assert_eq!(r7, vec![false, true]);
    assert_eq!(r8, vec![true, false]);
}

#[tokio::test]
async fn test_cache_tracks_list_through_many_toggles() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    let ids = ["a", "b", "c", "d"];

    for (round, id) in ids.iter().cycle().take(11).enumerate() {
        let payload = recipe(id, &format!("{id} v{round}"));
        ctx.favorites
            .toggle_favorite_recipe(&u1, &rid(id), &payload)
            .await
            .unwrap();

        let profile = ctx.favorites.get_user_profile(&u1).await.unwrap();
        assert_eq!(profile.orphaned_cache_entries().count(), 0, "round {round}");

        let mut listed = profile.favorite_recipe_ids.clone();
        listed.sort();
        listed.dedup();
        assert_eq!(listed.len(), profile.favorite_recipe_ids.len(), "round {round}");

        let recipes = profile.favorite_recipes();
        assert!(recipes.len() <= profile.favorite_recipe_ids.len());
        let order: Vec<_> = recipes.iter().map(|r| r.id.clone()).collect();
        assert_eq!(order, profile.favorite_recipe_ids, "round {round}");
    }
}

#[tokio::test]
async fn test_favorite_is_listed_once_with_latest_payload() {
    let ctx = TestContext::new();
    let u1 = uid("u1");

    ctx.favorites.save_allergies(&u1, &["shellfish"]).await.unwrap();
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r7"), &recipe("r7", "Soup"))
        .await
        .unwrap();
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r7"), &recipe("r7", "Soup"))
        .await
        .unwrap();
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r7"), &recipe("r7", "Soup II"))
        .await
        .unwrap();

    assert_eq!(
        ctx.raw_profile(&u1).await.unwrap(),
        json!({
            "allergies": ["shellfish"],
            "favoriteRecipes": ["r7"],
            "savedRecipes": {"r7": {"id": "r7", "title": "Soup II"}}
        })
    );
}

#[tokio::test]
async fn test_uncached_ids_are_skipped_not_fatal() {
    let ctx = TestContext::new();
    let u1 = uid("u1");
    ctx.favorites
        .toggle_favorite_recipe(&u1, &rid("r1"), &recipe("r1", "One"))
        .await
        .unwrap();

    // A document written by another client with a list entry but no cache entry.
    let mut doc = ctx.raw_profile(&u1).await.unwrap();
    doc["favoriteRecipes"] = json!(["r0", "r1"]);
    ctx.documents
        .set(USERS, "u1", doc.as_object().unwrap().clone())
        .await
        .unwrap();

    let recipes = ctx.favorites.get_favorite_recipes(&u1).await.unwrap();
    assert_eq!(recipes, vec![recipe("r1", "One")]);

    // Toggling the uncached ID removes it from the list.
    let now = ctx
        .favorites
        .toggle_favorite_recipe(&u1, &rid("r0"), &recipe("r0", "Zero"))
        .await
        .unwrap();
    assert!(!now);
    assert_eq!(
        ctx.favorites.get_user_profile(&u1).await.unwrap().favorite_recipe_ids,
        vec![rid("r1")]
    );
}

#[tokio::test]
async fn test_profiles_are_per_uid() {
    let ctx = TestContext::new();
    ctx.favorites
        .toggle_favorite_recipe(&uid("u1"), &rid("r7"), &recipe("r7", "Soup"))
        .await
        .unwrap();

    assert_eq!(
        ctx.favorites.get_user_profile(&uid("u2")).await.unwrap(),
        UserProfile::default()
    );
}

#[tokio::test]
async fn test_store_errors_surface_from_store_but_not_view() {
    let favorites = FavoritesStore::new(Arc::new(DenyingStore), "users");
    let u1 = uid("u1");

    let err = favorites
        .toggle_favorite_recipe(&u1, &rid("r7"), &recipe("r7", "Soup"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied(_)));
    assert!(favorites.save_allergies(&u1, &["nuts"]).await.is_err());

    let session = SessionSnapshot {
        provider: ProviderState::SignedIn(ProviderUser {
            uid: u1,
            email: None,
            display_name: None,
        }),
        guest: None,
    };
    let mut view = FavoritesView::new();
    assert_eq!(view.load(&session, &favorites).await, &FavoritesState::Empty);
}
