//! Stock ledger - the only writer of `items.current_stock`.
//!
//! Every mutation runs in one database transaction together with the transaction-log
//! row that describes it. Stock changes are applied with a conditional
//! `UPDATE ... SET current_stock = current_stock + delta WHERE current_stock + delta >= 0`,
//! so non-negativity is re-checked by the database at write time even when a caller's
//! pre-check raced with another request.

use crate::{
    core::{
        access::Actor,
        lifecycle::{self, EntityKind},
        transaction::{NewTransaction, record},
    },
    entities::{Category, Item, LifecycleState, TransactionKind, Unit, category, item, unit},
    errors::{Error, Result, Shortfall},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Stock status derived from current, minimum and maximum stock. Never stored.
///
/// Variants are declared most urgent first, so sorting by status puts empty
/// shelves at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Nothing on hand
    Out,
    /// At or below the minimum
    Low,
    /// At or below the midpoint between minimum and maximum
    Medium,
    /// Above the midpoint
    Healthy,
}

/// Decimal places kept for every stored quantity. The column is SQLite `REAL`, so
/// values are rounded to this scale before they are compared or written.
pub const QUANTITY_SCALE: u32 = 6;

/// Rounds a quantity to [`QUANTITY_SCALE`] and strips trailing zeros.
#[must_use]
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp(QUANTITY_SCALE).normalize()
}

/// Derives the status band. Bands are checked most urgent first, so a value sitting
/// exactly on a boundary lands in the more urgent band.
#[must_use]
pub fn compute_status(current: Decimal, minimum: Decimal, maximum: Decimal) -> StockStatus {
    if current <= Decimal::ZERO {
        StockStatus::Out
    } else if current <= minimum {
        StockStatus::Low
    } else if current <= minimum + (maximum - minimum) / Decimal::TWO {
        StockStatus::Medium
    } else {
        StockStatus::Healthy
    }
}

/// Caller-supplied fields for creating or editing an item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    /// Display name
    pub name: String,
    /// Category reference
    pub category_id: i64,
    /// Unit reference
    pub unit_id: i64,
    /// Quantity on hand
    pub current_stock: Decimal,
    /// Reorder threshold
    pub minimum_stock: Decimal,
    /// Target level
    pub maximum_stock: Decimal,
    /// Optional free text
    #[serde(default)]
    pub description: Option<String>,
}

/// An item together with its derived status and reference names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    /// Stored row
    #[serde(flatten)]
    pub item: item::Model,
    /// Derived status
    pub status: StockStatus,
    /// Category name
    pub category: String,
    /// Unit name
    pub unit: String,
}

fn require_non_negative(field: &str, value: Decimal) -> Result<Decimal> {
    let value = round_quantity(value);
    if value < Decimal::ZERO {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

/// An item input that passed validation, with trimmed text and rounded quantities.
struct ValidItem {
    name: String,
    description: Option<String>,
    current_stock: Decimal,
    minimum_stock: Decimal,
    maximum_stock: Decimal,
}

fn validate_item_input(input: &ItemInput) -> Result<ValidItem> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Item name cannot be empty"));
    }
    let current_stock = require_non_negative("current_stock", input.current_stock)?;
    let minimum_stock = require_non_negative("minimum_stock", input.minimum_stock)?;
    let maximum_stock = require_non_negative("maximum_stock", input.maximum_stock)?;
    if minimum_stock > maximum_stock {
        return Err(Error::validation(
            "minimum_stock cannot be greater than maximum_stock",
        ));
    }

    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToString::to_string);
    Ok(ValidItem {
        name: name.to_string(),
        description,
        current_stock,
        minimum_stock,
        maximum_stock,
    })
}

async fn ensure_references_exist<C>(db: &C, category_id: i64, unit_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    if Category::find_by_id(category_id).one(db).await?.is_none() {
        return Err(Error::validation(format!(
            "category {category_id} does not exist"
        )));
    }
    if Unit::find_by_id(unit_id).one(db).await?.is_none() {
        return Err(Error::validation(format!("unit {unit_id} does not exist")));
    }
    Ok(())
}

/// Loads an active item, or fails with `NotFound` if it is missing or archived.
pub(crate) async fn find_active_item<C>(db: &C, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    Item::find_by_id(item_id)
        .filter(item::Column::Lifecycle.eq(LifecycleState::Active))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("item", item_id))
}

/// Name of the unit an item is measured in, or an empty string if it has vanished.
pub(crate) async fn unit_name<C>(db: &C, unit_id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    Ok(Unit::find_by_id(unit_id)
        .one(db)
        .await?
        .map(|u| u.name)
        .unwrap_or_default())
}

/// Creates an item with its opening stock and logs an `added` transaction.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` for a blank name, negative quantities, minimum above
///   maximum, or an unknown category/unit
/// - `DuplicateName` if an active item has the same name ignoring case and whitespace
pub async fn create_item(
    db: &DatabaseConnection,
    actor: &Actor,
    input: &ItemInput,
) -> Result<item::Model> {
    actor.require_manager("create items")?;
    let valid = validate_item_input(input)?;

    let txn = db.begin().await?;
    ensure_references_exist(&txn, input.category_id, input.unit_id).await?;
    lifecycle::ensure_name_available::<Item, _>(&txn, &valid.name, None).await?;

    let now = Utc::now();
    let created = item::ActiveModel {
        name_key: Set(lifecycle::normalize_name(&valid.name)),
        name: Set(valid.name),
        category_id: Set(input.category_id),
        unit_id: Set(input.unit_id),
        current_stock: Set(valid.current_stock),
        minimum_stock: Set(valid.minimum_stock),
        maximum_stock: Set(valid.maximum_stock),
        ordered: Set(false),
        description: Set(valid.description),
        lifecycle: Set(LifecycleState::Active),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Added,
            actor.user_id,
            format!("Added item '{}'", created.name),
        )
        .item(created.id)
        .quantity(created.current_stock),
    )
    .await?;
    txn.commit().await?;

    info!(item_id = created.id, name = %created.name, actor = actor.user_id, "item created");
    Ok(created)
}

/// Replaces an active item's editable fields and logs an `update` transaction whose
/// notes record the old and new stock. The logged quantity is the net stock change.
///
/// # Errors
/// Same as [`create_item`], plus `NotFound` if the item is missing or archived.
pub async fn update_item(
    db: &DatabaseConnection,
    actor: &Actor,
    item_id: i64,
    input: &ItemInput,
) -> Result<item::Model> {
    actor.require_manager("update items")?;
    let valid = validate_item_input(input)?;

    let txn = db.begin().await?;
    let existing = find_active_item(&txn, item_id).await?;
    ensure_references_exist(&txn, input.category_id, input.unit_id).await?;
    lifecycle::ensure_name_available::<Item, _>(&txn, &valid.name, Some(item_id)).await?;

    let old_stock = existing.current_stock;
    let mut active: item::ActiveModel = existing.into();
    active.name_key = Set(lifecycle::normalize_name(&valid.name));
    active.name = Set(valid.name);
    active.category_id = Set(input.category_id);
    active.unit_id = Set(input.unit_id);
    active.current_stock = Set(valid.current_stock);
    active.minimum_stock = Set(valid.minimum_stock);
    active.maximum_stock = Set(valid.maximum_stock);
    active.description = Set(valid.description);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Update,
            actor.user_id,
            format!(
                "Updated item '{}': stock {} -> {}",
                updated.name,
                round_quantity(old_stock),
                round_quantity(updated.current_stock)
            ),
        )
        .item(updated.id)
        .quantity(round_quantity(updated.current_stock - old_stock)),
    )
    .await?;
    txn.commit().await?;

    info!(item_id, actor = actor.user_id, "item updated");
    Ok(updated)
}

/// Applies `delta` to an item's stock on `db` (the caller's open transaction) and
/// appends `entry`. The new quantity is computed from the stock read inside `db`, and
/// the write only lands if that stock is still current. A result below zero is
/// rejected with `InsufficientStock`; nothing is written or logged.
pub(crate) async fn apply_adjustment<C>(
    db: &C,
    item_id: i64,
    delta: Decimal,
    entry: NewTransaction,
) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let item = find_active_item(db, item_id).await?;
    let new_stock = round_quantity(item.current_stock + delta);
    if new_stock < Decimal::ZERO {
        debug!(item_id, %delta, available = %item.current_stock, "adjustment rejected");
        return Err(Error::InsufficientStock {
            shortfalls: vec![Shortfall {
                item_id,
                unit: unit_name(db, item.unit_id).await?,
                item_name: item.name,
                required: -delta,
                available: item.current_stock,
            }],
        });
    }

    let result = Item::update_many()
        .col_expr(item::Column::CurrentStock, Expr::value(new_stock))
        .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(item::Column::Id.eq(item_id))
        .filter(item::Column::Lifecycle.eq(LifecycleState::Active))
        .filter(item::Column::CurrentStock.eq(item.current_stock))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        warn!(item_id, "stock changed during adjustment");
        return Err(DbErr::RecordNotUpdated.into());
    }

    record(db, entry.item(item_id)).await?;
    find_active_item(db, item_id).await
}

/// Adds `delta` (possibly negative) to an item's stock and logs one transaction of
/// `kind`. Returns the new quantity.
///
/// `usage` and `delete` take a negative delta, `restock` a positive one, and `update`
/// either sign. The logged quantity is the magnitude of the change, except for
/// `update`, which keeps the sign.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` for a zero delta, or a kind that does not match it
/// - `NotFound` if the item is missing or archived
/// - `InsufficientStock` if the result would be negative; stock is left unchanged
pub async fn adjust_stock(
    db: &DatabaseConnection,
    actor: &Actor,
    item_id: i64,
    delta: Decimal,
    kind: TransactionKind,
    notes: Option<String>,
) -> Result<Decimal> {
    actor.require_manager("adjust stock")?;
    let delta = round_quantity(delta);
    if delta.is_zero() {
        return Err(Error::validation("delta must be a non-zero number"));
    }
    let logged_quantity = match kind {
        TransactionKind::Usage | TransactionKind::Delete if delta < Decimal::ZERO => -delta,
        TransactionKind::Restock if delta > Decimal::ZERO => delta,
        TransactionKind::Update => delta,
        _ => {
            return Err(Error::validation(format!(
                "a {kind:?} transaction cannot carry a delta of {delta}"
            )));
        }
    };

    let txn = db.begin().await?;
    let item = find_active_item(&txn, item_id).await?;
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Adjusted '{}' by {delta}", item.name));

    let updated = apply_adjustment(
        &txn,
        item_id,
        delta,
        NewTransaction::new(kind, actor.user_id, notes).quantity(logged_quantity),
    )
    .await?;
    txn.commit().await?;

    info!(item_id, %delta, new_stock = %updated.current_stock, actor = actor.user_id, "stock adjusted");
    Ok(updated.current_stock)
}

/// Archives an item. See [`lifecycle::archive_entity`].
pub async fn archive_item(db: &DatabaseConnection, actor: &Actor, item_id: i64) -> Result<()> {
    lifecycle::archive(db, actor, EntityKind::Item, item_id).await
}

/// Restores an archived item. See [`lifecycle::restore_entity`].
pub async fn restore_item(db: &DatabaseConnection, actor: &Actor, item_id: i64) -> Result<()> {
    lifecycle::restore(db, actor, EntityKind::Item, item_id).await
}

/// Permanently deletes an archived item. See [`lifecycle::purge_entity`].
pub async fn purge_item(db: &DatabaseConnection, actor: &Actor, item_id: i64) -> Result<()> {
    lifecycle::purge(db, actor, EntityKind::Item, item_id).await
}

async fn reference_names(
    db: &DatabaseConnection,
) -> Result<(HashMap<i64, String>, HashMap<i64, String>)> {
    let categories = Category::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c: category::Model| (c.id, c.name))
        .collect();
    let units = Unit::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u: unit::Model| (u.id, u.name))
        .collect();
    Ok((categories, units))
}

fn to_view(
    item: item::Model,
    categories: &HashMap<i64, String>,
    units: &HashMap<i64, String>,
) -> ItemView {
    ItemView {
        status: compute_status(item.current_stock, item.minimum_stock, item.maximum_stock),
        category: categories.get(&item.category_id).cloned().unwrap_or_default(),
        unit: units.get(&item.unit_id).cloned().unwrap_or_default(),
        item,
    }
}

/// Retrieves one active item with its derived status.
pub async fn get_item(db: &DatabaseConnection, item_id: i64) -> Result<ItemView> {
    let item = find_active_item(db, item_id).await?;
    let (categories, units) = reference_names(db).await?;
    Ok(to_view(item, &categories, &units))
}

/// Retrieves all active items with their derived status, ordered by name.
pub async fn list_items(db: &DatabaseConnection) -> Result<Vec<ItemView>> {
    let items = Item::find()
        .filter(item::Column::Lifecycle.eq(LifecycleState::Active))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await?;
    let (categories, units) = reference_names(db).await?;
    Ok(items
        .into_iter()
        .map(|item| to_view(item, &categories, &units))
        .collect())
}
