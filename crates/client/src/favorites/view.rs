//! State behind a "my favorites" screen.
//!
//! Loading is split in three so a front end can run the fetch without
//! holding the view: [`FavoritesView::begin_load`] hands out a
//! [`LoadTicket`], [`FavoritesView::fetch`] runs against the store, and
//! [`FavoritesView::finish_load`] applies the result unless the view was
//! invalidated in the meantime.

use sss_core::{Recipe, RecipeId, Uid};
use tracing::{debug, warn};

use super::FavoritesStore;
use crate::session::SessionSnapshot;

/// What the favorites screen shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FavoritesState {
    /// Favorites need a signed-in account (guests included).
    SignInRequired,
    /// Waiting for the session or the store.
    #[default]
    Loading,
    /// Signed in with no favorites, or the fetch failed.
    Empty,
    /// Favorites in list order.
    Loaded(Vec<Recipe>),
}

/// Permission to run one fetch, tied to the view generation it started in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    uid: Uid,
    generation: u64,
}

impl LoadTicket {
    /// The uid whose favorites to fetch.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        &self.uid
    }
}

/// Outcome of [`FavoritesView::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFavorites {
    generation: u64,
    recipes: Vec<Recipe>,
}

/// Favorites screen model.
#[derive(Debug, Default)]
pub struct FavoritesView {
    state: FavoritesState,
    generation: u64,
}

impl FavoritesView {
    /// A view waiting for its first load.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current screen state.
    #[must_use]
    pub const fn state(&self) -> &FavoritesState {
        &self.state
    }

    /// Start a load for the given session.
    ///
    /// Returns `None` when there is nothing to fetch: the session is still
    /// loading, or nobody is signed in (the view switches to
    /// `SignInRequired`).
    pub fn begin_load(&mut self, session: &SessionSnapshot) -> Option<LoadTicket> {
        if session.is_loading() {
            self.state = FavoritesState::Loading;
            return None;
        }

        self.generation = self.generation.wrapping_add(1);
        let Some(user) = session.provider.user() else {
            self.state = FavoritesState::SignInRequired;
            return None;
        };

        self.state = FavoritesState::Loading;
        Some(LoadTicket {
            uid: user.uid.clone(),
            generation: self.generation,
        })
    }

    /// Fetch favorites for a ticket. Store errors are logged and read as
    /// "no favorites".
    pub async fn fetch(store: &FavoritesStore, ticket: LoadTicket) -> LoadedFavorites {
        let recipes = match store.get_favorite_recipes(&ticket.uid).await {
            Ok(recipes) => recipes,
            Err(e) => {
                warn!(uid = %ticket.uid, error = %e, "Could not load favorites; showing none");
                Vec::new()
            }
        };

        LoadedFavorites {
            generation: ticket.generation,
            recipes,
        }
    }

    /// Apply a fetch result. Returns `false`, leaving the view untouched, if
    /// the view was invalidated or reloaded since the ticket was issued.
    pub fn finish_load(&mut self, loaded: LoadedFavorites) -> bool {
        if loaded.generation != self.generation {
            debug!(
                ticket = loaded.generation,
                current = self.generation,
                "Dropping stale favorites load"
            );
            return false;
        }

        self.state = if loaded.recipes.is_empty() {
            FavoritesState::Empty
        } else {
            FavoritesState::Loaded(loaded.recipes)
        };
        true
    }

    /// Begin, fetch, and finish in one call.
    pub async fn load(
        &mut self,
        session: &SessionSnapshot,
        store: &FavoritesStore,
    ) -> &FavoritesState {
        if let Some(ticket) = self.begin_load(session) {
            let loaded = Self::fetch(store, ticket).await;
            self.finish_load(loaded);
        }
        &self.state
    }

    /// Discard any load in flight, as when the screen is torn down.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Reflect a toggle made from this screen without re-fetching.
    ///
    /// Only removals change the list; a recipe favorited elsewhere shows up
    /// on the next load.
    pub fn on_favorite_change(&mut self, recipe_id: &RecipeId, favorited: bool) {
        if favorited {
            return;
        }
        if let FavoritesState::Loaded(recipes) = &mut self.state {
            recipes.retain(|recipe| &recipe.id != recipe_id);
            if recipes.is_empty() {
                self.state = FavoritesState::Empty;
            }
        }
    }
}
