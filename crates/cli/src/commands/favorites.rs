//! Profile and favorites commands.

use std::path::Path;

use sss_client::{AppError, Result};
use sss_core::Recipe;

use super::{Context, print_json, print_line};

/// Print the profile document.
pub async fn profile(ctx: &Context, email: Option<&str>) -> Result<()> {
    let uid = ctx.active_uid(email).await?;
    let profile = ctx.favorites.get_user_profile(&uid).await?;
    print_json(&profile)
}

/// Print favorite recipes in list order.
pub async fn list(ctx: &Context, email: Option<&str>) -> Result<()> {
    let uid = ctx.active_uid(email).await?;
    let recipes = ctx.favorites.get_favorite_recipes(&uid).await?;
    print_json(&recipes)
}

/// Toggle the recipe stored in `path`.
pub async fn toggle(ctx: &Context, email: Option<&str>, path: &Path) -> Result<()> {
    let recipe = read_recipe(path)?;
    let uid = ctx.active_uid(email).await?;

    let favorited = ctx
        .favorites
        .toggle_favorite_recipe(&uid, &recipe.id, &recipe)
        .await?;

    let label = recipe.title().unwrap_or_else(|| recipe.id.as_str());
    if favorited {
        print_line(&format!("Added {label} to favorites"));
    } else {
        print_line(&format!("Removed {label} from favorites"));
    }
    Ok(())
}

/// Replace the allergy list.
pub async fn allergies(
    ctx: &Context,
    email: Option<&str>,
    items: &[String],
) -> Result<()> {
    let uid = ctx.active_uid(email).await?;
    let saved = ctx.favorites.save_allergies(&uid, items).await?;
    print_json(&saved)
}

fn read_recipe(path: &Path) -> Result<Recipe> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::BadRequest(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("{} is not a recipe: {e}", path.display())))
}
