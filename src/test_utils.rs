//! Shared test utilities for the inventory core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        access::Actor,
        ledger::{self, ItemInput},
        recipe::{self, IngredientInput},
    },
    entities::{Category, Item, LifecycleState, Role, Unit, User, category, item, unit, user},
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set, prelude::*, sea_query::Expr};

/// Category every test item is filed under.
pub const TEST_CATEGORY: &str = "Test Supplies";
/// Unit every test item is measured in.
pub const TEST_UNIT: &str = "pcs";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test database with the test category and unit seeded and one manager
/// account ("manager"). Returns the database and the manager as an actor.
pub async fn setup_with_manager() -> Result<(DatabaseConnection, Actor)> {
    let db = setup_test_db().await?;
    category::ActiveModel {
        name: Set(TEST_CATEGORY.to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    unit::ActiveModel {
        name: Set(TEST_UNIT.to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    let manager = insert_user(&db, "manager", Role::Manager).await?;
    Ok((db, manager))
}

/// Inserts an active account directly, skipping password hashing.
pub async fn insert_user(db: &DatabaseConnection, username: &str, role: Role) -> Result<Actor> {
    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username.to_string()),
        name_key: Set(crate::core::lifecycle::normalize_name(username)),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(role),
        lifecycle: Set(LifecycleState::Active),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(Actor::from(&created))
}

/// Inserts an active barista account.
pub async fn create_barista(db: &DatabaseConnection, username: &str) -> Result<Actor> {
    insert_user(db, username, Role::Barista).await
}

/// A manager actor that need not exist in the database (for paths that fail early).
#[must_use]
pub const fn manager_actor(user_id: i64) -> Actor {
    Actor::new(user_id, Role::Manager)
}

/// A barista actor that need not exist in the database.
#[must_use]
pub const fn barista_actor(user_id: i64) -> Actor {
    Actor::new(user_id, Role::Barista)
}

/// Builds an item input.
///
/// # Defaults
/// * `minimum_stock`: 10
/// * `maximum_stock`: 50
/// * `description`: None
#[must_use]
pub fn item_input(name: &str, category_id: i64, unit_id: i64, current_stock: Decimal) -> ItemInput {
    ItemInput {
        name: name.to_string(),
        category_id,
        unit_id,
        current_stock,
        minimum_stock: Decimal::TEN,
        maximum_stock: Decimal::from(50),
        description: None,
    }
}

/// Creates an item in the test category and unit with the defaults of [`item_input`].
pub async fn create_test_item(
    db: &DatabaseConnection,
    actor: &Actor,
    name: &str,
    current_stock: Decimal,
) -> Result<item::Model> {
    let category_id = Category::find()
        .filter(category::Column::Name.eq(TEST_CATEGORY))
        .one(db)
        .await?
        .ok_or_else(|| Error::validation("test category not seeded"))?
        .id;
    let unit_id = Unit::find()
        .filter(unit::Column::Name.eq(TEST_UNIT))
        .one(db)
        .await?
        .ok_or_else(|| Error::validation("test unit not seeded"))?
        .id;
    ledger::create_item(db, actor, &item_input(name, category_id, unit_id, current_stock)).await
}

/// Loads an item in any lifecycle state.
pub async fn fetch_item(db: &DatabaseConnection, item_id: i64) -> Result<item::Model> {
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("item", item_id))
}

/// Creates a recipe through the normal API.
pub async fn create_test_recipe(
    db: &DatabaseConnection,
    actor: &Actor,
    name: &str,
    ingredients: &[IngredientInput],
) -> Result<crate::entities::RecipeModel> {
    recipe::create_recipe(db, actor, name, ingredients).await
}

/// Moves an archived item's `deleted_at` back by `days`.
pub async fn backdate_item_archive(db: &DatabaseConnection, item_id: i64, days: i64) -> Result<()> {
    Item::update_many()
        .col_expr(
            item::Column::DeletedAt,
            Expr::value(Some(Utc::now() - Duration::days(days))),
        )
        .filter(item::Column::Id.eq(item_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Moves an archived account's `deleted_at` back by `days`.
pub async fn backdate_user_archive(db: &DatabaseConnection, user_id: i64, days: i64) -> Result<()> {
    User::update_many()
        .col_expr(
            user::Column::DeletedAt,
            Expr::value(Some(Utc::now() - Duration::days(days))),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Installs a test-writer tracing subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
