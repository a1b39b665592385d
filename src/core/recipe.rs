//! Recipe management - named drinks and their per-serving ingredient lists.

use crate::{
    core::{
        access::Actor,
        ledger::round_quantity,
        lifecycle::{self, EntityKind},
        transaction::{NewTransaction, record},
    },
    entities::{
        Item, LifecycleState, Recipe, RecipeIngredient, TransactionKind, Unit, item, recipe,
        recipe_ingredient,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// One ingredient line supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct IngredientInput {
    /// Item consumed
    pub item_id: i64,
    /// Quantity per serving
    pub quantity_required: Decimal,
}

/// An ingredient joined with its item's name and unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientView {
    /// Item consumed
    pub item_id: i64,
    /// Item name
    pub item_name: String,
    /// Quantity per serving
    pub quantity_required: Decimal,
    /// Unit name
    pub unit: String,
    /// Whether the item is still active
    pub active: bool,
}

/// A recipe with its ingredients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    /// Stored row
    #[serde(flatten)]
    pub recipe: recipe::Model,
    /// Ingredient lines, ordered by item name
    pub ingredients: Vec<IngredientView>,
}

fn validate_recipe(name: &str, ingredients: &[IngredientInput]) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Recipe name cannot be empty"));
    }
    if ingredients.is_empty() {
        return Err(Error::validation("A recipe needs at least one ingredient"));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if round_quantity(ingredient.quantity_required) <= Decimal::ZERO {
            return Err(Error::validation(format!(
                "quantity for item {} must be greater than zero",
                ingredient.item_id
            )));
        }
        if !seen.insert(ingredient.item_id) {
            return Err(Error::validation(format!(
                "item {} is listed more than once",
                ingredient.item_id
            )));
        }
    }
    Ok(name.to_string())
}

/// Checks every ingredient references an active item, then inserts the rows.
async fn insert_ingredients<C>(db: &C, recipe_id: i64, ingredients: &[IngredientInput]) -> Result<()>
where
    C: ConnectionTrait,
{
    for ingredient in ingredients {
        let exists = Item::find_by_id(ingredient.item_id)
            .filter(item::Column::Lifecycle.eq(LifecycleState::Active))
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(Error::not_found("item", ingredient.item_id));
        }
    }

    let rows = ingredients.iter().map(|i| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        item_id: Set(i.item_id),
        quantity_required: Set(round_quantity(i.quantity_required)),
        ..Default::default()
    });
    RecipeIngredient::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Creates a recipe with its ingredient list and logs an `added` transaction.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` for a blank name, an empty list, a non-positive quantity or a
///   repeated item
/// - `NotFound` if an ingredient's item is missing or archived
/// - `DuplicateName` if an active recipe already has the name
pub async fn create_recipe(
    db: &DatabaseConnection,
    actor: &Actor,
    name: &str,
    ingredients: &[IngredientInput],
) -> Result<recipe::Model> {
    actor.require_manager("create recipes")?;
    let name = validate_recipe(name, ingredients)?;

    let txn = db.begin().await?;
    lifecycle::ensure_name_available::<Recipe, _>(&txn, &name, None).await?;

    let now = Utc::now();
    let created = recipe::ActiveModel {
        name_key: Set(lifecycle::normalize_name(&name)),
        name: Set(name),
        lifecycle: Set(LifecycleState::Active),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    insert_ingredients(&txn, created.id, ingredients).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Added,
            actor.user_id,
            format!(
                "Added recipe '{}' with {} ingredient(s)",
                created.name,
                ingredients.len()
            ),
        )
        .recipe(created.id),
    )
    .await?;
    txn.commit().await?;

    info!(recipe_id = created.id, name = %created.name, actor = actor.user_id, "recipe created");
    Ok(created)
}

/// Renames an active recipe and replaces its whole ingredient list in one atomic unit.
///
/// # Errors
/// Same as [`create_recipe`], plus `NotFound` if the recipe is missing or archived.
pub async fn update_recipe(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i64,
    name: &str,
    ingredients: &[IngredientInput],
) -> Result<recipe::Model> {
    actor.require_manager("update recipes")?;
    let name = validate_recipe(name, ingredients)?;

    let txn = db.begin().await?;
    let existing = Recipe::find_by_id(recipe_id)
        .filter(recipe::Column::Lifecycle.eq(LifecycleState::Active))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("recipe", recipe_id))?;
    lifecycle::ensure_name_available::<Recipe, _>(&txn, &name, Some(recipe_id)).await?;

    let mut active: recipe::ActiveModel = existing.into();
    active.name_key = Set(lifecycle::normalize_name(&name));
    active.name = Set(name);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    insert_ingredients(&txn, recipe_id, ingredients).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Update,
            actor.user_id,
            format!(
                "Updated recipe '{}' with {} ingredient(s)",
                updated.name,
                ingredients.len()
            ),
        )
        .recipe(recipe_id),
    )
    .await?;
    txn.commit().await?;

    info!(recipe_id, actor = actor.user_id, "recipe updated");
    Ok(updated)
}

async fn ingredient_views(
    db: &DatabaseConnection,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<IngredientView>>> {
    let units: HashMap<i64, String> = Unit::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let rows = RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.iter().copied()))
        .find_also_related(Item)
        .all(db)
        .await?;

    let mut views: HashMap<i64, Vec<IngredientView>> = HashMap::new();
    for (ingredient, item) in rows {
        let Some(item) = item else { continue };
        views
            .entry(ingredient.recipe_id)
            .or_default()
            .push(IngredientView {
                item_id: item.id,
                unit: units.get(&item.unit_id).cloned().unwrap_or_default(),
                active: item.lifecycle.is_active(),
                item_name: item.name,
                quantity_required: ingredient.quantity_required,
            });
    }
    for list in views.values_mut() {
        list.sort_by(|a, b| a.item_name.cmp(&b.item_name));
    }
    Ok(views)
}

/// Retrieves one active recipe with its ingredients.
pub async fn get_recipe(db: &DatabaseConnection, recipe_id: i64) -> Result<RecipeView> {
    let recipe = Recipe::find_by_id(recipe_id)
        .filter(recipe::Column::Lifecycle.eq(LifecycleState::Active))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("recipe", recipe_id))?;
    let mut ingredients = ingredient_views(db, &[recipe_id]).await?;

    Ok(RecipeView {
        ingredients: ingredients.remove(&recipe_id).unwrap_or_default(),
        recipe,
    })
}

/// Retrieves all active recipes with their ingredients, ordered by name.
pub async fn list_recipes(db: &DatabaseConnection) -> Result<Vec<RecipeView>> {
    let recipes = Recipe::find()
        .filter(recipe::Column::Lifecycle.eq(LifecycleState::Active))
        .order_by_asc(recipe::Column::Name)
        .all(db)
        .await?;
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut ingredients = ingredient_views(db, &ids).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeView {
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

/// Archives a recipe.
pub async fn archive_recipe(db: &DatabaseConnection, actor: &Actor, recipe_id: i64) -> Result<()> {
    lifecycle::archive(db, actor, EntityKind::Recipe, recipe_id).await
}

/// Restores an archived recipe.
pub async fn restore_recipe(db: &DatabaseConnection, actor: &Actor, recipe_id: i64) -> Result<()> {
    lifecycle::restore(db, actor, EntityKind::Recipe, recipe_id).await
}

/// Permanently deletes an archived recipe and its ingredient rows.
pub async fn purge_recipe(db: &DatabaseConnection, actor: &Actor, recipe_id: i64) -> Result<()> {
    lifecycle::purge(db, actor, EntityKind::Recipe, recipe_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{ledger, transaction};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn line(item_id: i64, quantity_required: Decimal) -> IngredientInput {
        IngredientInput {
            item_id,
            quantity_required,
        }
    }

    #[tokio::test]
    async fn test_recipe_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let manager = manager_actor(1);

        let result = create_recipe(&db, &manager, " ", &[line(1, dec!(1))]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_recipe(&db, &manager, "Latte", &[]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_recipe(&db, &manager, "Latte", &[line(1, dec!(0))]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_recipe(&db, &manager, "Latte", &[line(1, dec!(1)), line(1, dec!(2))]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_recipe(&db, &barista_actor(2), "Latte", &[line(1, dec!(1))]).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_get_recipe() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let beans = create_test_item(&db, &manager, "Beans", dec!(10)).await?;

        let latte =
            create_recipe(&db, &manager, " Latte ", &[line(milk.id, dec!(0.2)), line(beans.id, dec!(0.02))])
                .await?;
        assert_eq!(latte.name, "Latte");

        let view = get_recipe(&db, latte.id).await?;
        assert_eq!(view.ingredients.len(), 2);
        assert_eq!(view.ingredients[0].item_name, "Beans");
        assert_eq!(view.ingredients[0].unit, TEST_UNIT);
        assert_eq!(view.ingredients[1].quantity_required, dec!(0.2));

        let log = transaction::list_transactions(
            &db,
            &transaction::TransactionFilter {
                recipe_id: Some(latte.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].transaction_type, TransactionKind::Added);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_recipe_with_archived_item_fails() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        ledger::archive_item(&db, &manager, milk.id).await?;

        let result = create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(1))]).await;
        assert!(matches!(result, Err(Error::NotFound { kind: "item", .. })));
        assert!(list_recipes(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_recipe_name() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(1))]).await?;

        let result = create_recipe(&db, &manager, "LATTE", &[line(milk.id, dec!(1))]).await;
        assert!(matches!(
            result,
            Err(Error::DuplicateName { kind: "recipe", .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_ingredients() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let oat = create_test_item(&db, &manager, "Oat Milk", dec!(10)).await?;
        let latte = create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(0.2))]).await?;

        let updated =
            update_recipe(&db, &manager, latte.id, "Oat Latte", &[line(oat.id, dec!(0.25))]).await?;
        assert_eq!(updated.name, "Oat Latte");

        let view = get_recipe(&db, latte.id).await?;
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].item_id, oat.id);
        assert_eq!(view.ingredients[0].quantity_required, dec!(0.25));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_ingredients() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let latte = create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(0.2))]).await?;

        let result = update_recipe(&db, &manager, latte.id, "Latte", &[line(9999, dec!(1))]).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let view = get_recipe(&db, latte.id).await?;
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].item_id, milk.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_recipe_lifecycle_and_cascade() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let latte = create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(0.2))]).await?;

        archive_recipe(&db, &manager, latte.id).await?;
        assert!(list_recipes(&db).await?.is_empty());
        assert!(matches!(
            get_recipe(&db, latte.id).await,
            Err(Error::NotFound { .. })
        ));

        restore_recipe(&db, &manager, latte.id).await?;
        assert_eq!(list_recipes(&db).await?.len(), 1);

        archive_recipe(&db, &manager, latte.id).await?;
        purge_recipe(&db, &manager, latte.id).await?;
        let leftovers = RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(latte.id))
            .all(&db)
            .await?;
        assert!(leftovers.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_recipe_view_flags_archived_ingredient() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let syrup = create_test_item(&db, &manager, "Syrup", dec!(10)).await?;
        let latte =
            create_recipe(&db, &manager, "Latte", &[line(milk.id, dec!(0.2)), line(syrup.id, dec!(0.1))])
                .await?;

        ledger::archive_item(&db, &manager, syrup.id).await?;
        let view = get_recipe(&db, latte.id).await?;
        assert_eq!(view.ingredients.len(), 2);
        assert!(view.ingredients[0].active);
        assert!(!view.ingredients[1].active);

        Ok(())
    }
}
