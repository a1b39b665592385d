//! Ordering status: the per-item "on order" flag and the restock that clears it.

use crate::{
    core::{
        access::Actor,
        ledger::{apply_adjustment, find_active_item, round_quantity},
        transaction::{NewTransaction, record},
    },
    entities::{TransactionKind, item},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::info;

/// Flags an active item as ordered and logs an `update` transaction.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `NotFound` if the item is missing or archived
/// - `AlreadyOrdered` if the flag is already set
pub async fn mark_ordered(
    db: &DatabaseConnection,
    actor: &Actor,
    item_id: i64,
) -> Result<item::Model> {
    actor.require_manager("mark items as ordered")?;

    let txn = db.begin().await?;
    let existing = find_active_item(&txn, item_id).await?;
    if existing.ordered {
        return Err(Error::AlreadyOrdered { item_id });
    }

    let name = existing.name.clone();
    let mut active: item::ActiveModel = existing.into();
    active.ordered = Set(true);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Update,
            actor.user_id,
            format!("Marked '{name}' as ordered"),
        )
        .item(item_id),
    )
    .await?;
    txn.commit().await?;

    info!(item_id, actor = actor.user_id, "item marked as ordered");
    Ok(updated)
}

/// Adds delivered stock to an item, logs a `restock` transaction and clears the
/// ordered flag, all in one transaction. Restocking an item that was never flagged
/// is allowed.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` if `added` is not a positive number
/// - `NotFound` if the item is missing or archived
pub async fn restock(
    db: &DatabaseConnection,
    actor: &Actor,
    item_id: i64,
    added: Decimal,
) -> Result<item::Model> {
    actor.require_manager("restock items")?;
    let added = round_quantity(added);
    if added <= Decimal::ZERO {
        return Err(Error::validation("restock amount must be greater than zero"));
    }

    let txn = db.begin().await?;
    let existing = find_active_item(&txn, item_id).await?;
    let restocked = apply_adjustment(
        &txn,
        item_id,
        added,
        NewTransaction::new(
            TransactionKind::Restock,
            actor.user_id,
            format!("Restocked '{}' with {added}", existing.name),
        )
        .quantity(added),
    )
    .await?;

    let mut active: item::ActiveModel = restocked.into();
    active.ordered = Set(false);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(item_id, %added, new_stock = %updated.current_stock, actor = actor.user_id, "item restocked");
    Ok(updated)
}
