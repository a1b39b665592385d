//! Soft-delete lifecycle shared by items, recipes and user accounts.
//!
//! Rows move `active -> archived -> purged`, and `archived -> active` is the only way
//! back. Archiving stamps `deleted_at`; purging removes the row after writing a final
//! `purge` transaction. Archived rows older than [`PURGE_RETENTION_DAYS`] are removed in
//! bulk by [`sweep_expired`], one atomic unit per row.
//!
//! The state machine is written once against the [`SoftDelete`] trait; the per-entity
//! wrappers in `ledger`, `recipe` and `user` add nothing but their own names.

use crate::{
    core::{
        access::Actor,
        transaction::{NewTransaction, record},
    },
    entities::{Item, LifecycleState, Recipe, Role, TransactionKind, User, item, recipe, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, QueryTrait, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Days an archived row is kept before the sweep purges it.
pub const PURGE_RETENTION_DAYS: i64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// The kinds of rows that share the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Stock items
    Item,
    /// Recipes
    Recipe,
    /// Team accounts
    User,
}

impl EntityKind {
    /// Every kind, in sweep order
    pub const ALL: [Self; 3] = [Self::Item, Self::Recipe, Self::User];

    /// Lowercase label used in messages and errors
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Recipe => "recipe",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle-relevant view of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    /// Row id
    pub id: i64,
    /// Display name (username for accounts)
    pub name: String,
    /// Stored state
    pub lifecycle: LifecycleState,
    /// Archive timestamp
    pub deleted_at: Option<DateTime<Utc>>,
}

/// An entity whose table carries the lifecycle columns.
pub trait SoftDelete: EntityTrait<Model: Sync> {
    /// Which kind this entity is
    const KIND: EntityKind;

    /// Primary key column
    fn id_column() -> Self::Column;
    /// `lifecycle` column
    fn lifecycle_column() -> Self::Column;
    /// `deleted_at` column
    fn deleted_at_column() -> Self::Column;
    /// `updated_at` column
    fn updated_at_column() -> Self::Column;
    /// `name_key` column, holding [`normalize_name`] of the display name
    fn name_key_column() -> Self::Column;
    /// Extracts the lifecycle fields of a row.
    fn snapshot(model: &Self::Model) -> LifecycleSnapshot;
    /// Points a log entry at the row, where the log has a column for this kind.
    fn reference(entry: NewTransaction, id: i64) -> NewTransaction;

    /// Extra check before a row may be archived.
    fn archive_guard(_model: &Self::Model) -> Result<()> {
        Ok(())
    }
}

impl SoftDelete for Item {
    const KIND: EntityKind = EntityKind::Item;

    fn id_column() -> Self::Column {
        item::Column::Id
    }
    fn lifecycle_column() -> Self::Column {
        item::Column::Lifecycle
    }
    fn deleted_at_column() -> Self::Column {
        item::Column::DeletedAt
    }
    fn updated_at_column() -> Self::Column {
        item::Column::UpdatedAt
    }
    fn name_key_column() -> Self::Column {
        item::Column::NameKey
    }
    fn snapshot(model: &item::Model) -> LifecycleSnapshot {
        LifecycleSnapshot {
            id: model.id,
            name: model.name.clone(),
            lifecycle: model.lifecycle,
            deleted_at: model.deleted_at,
        }
    }
    fn reference(entry: NewTransaction, id: i64) -> NewTransaction {
        entry.item(id)
    }
}

impl SoftDelete for Recipe {
    const KIND: EntityKind = EntityKind::Recipe;

    fn id_column() -> Self::Column {
        recipe::Column::Id
    }
    fn lifecycle_column() -> Self::Column {
        recipe::Column::Lifecycle
    }
    fn deleted_at_column() -> Self::Column {
        recipe::Column::DeletedAt
    }
    fn updated_at_column() -> Self::Column {
        recipe::Column::UpdatedAt
    }
    fn name_key_column() -> Self::Column {
        recipe::Column::NameKey
    }
    fn snapshot(model: &recipe::Model) -> LifecycleSnapshot {
        LifecycleSnapshot {
            id: model.id,
            name: model.name.clone(),
            lifecycle: model.lifecycle,
            deleted_at: model.deleted_at,
        }
    }
    fn reference(entry: NewTransaction, id: i64) -> NewTransaction {
        entry.recipe(id)
    }
}

impl SoftDelete for User {
    const KIND: EntityKind = EntityKind::User;

    fn id_column() -> Self::Column {
        user::Column::Id
    }
    fn lifecycle_column() -> Self::Column {
        user::Column::Lifecycle
    }
    fn deleted_at_column() -> Self::Column {
        user::Column::DeletedAt
    }
    fn updated_at_column() -> Self::Column {
        user::Column::UpdatedAt
    }
    fn name_key_column() -> Self::Column {
        user::Column::NameKey
    }
    fn snapshot(model: &user::Model) -> LifecycleSnapshot {
        LifecycleSnapshot {
            id: model.id,
            name: model.username.clone(),
            lifecycle: model.lifecycle,
            deleted_at: model.deleted_at,
        }
    }
    // The log's user column holds the actor; the subject account is named in the notes.
    fn reference(entry: NewTransaction, _id: i64) -> NewTransaction {
        entry
    }
    fn archive_guard(model: &user::Model) -> Result<()> {
        if model.role == Role::Manager {
            return Err(Error::forbidden("manager accounts cannot be archived"));
        }
        Ok(())
    }
}

/// Lowercases and collapses whitespace so "  Oat  Milk " and "oat milk" compare equal.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fails with [`Error::DuplicateName`] if an active row of kind `E`, other than
/// `exclude_id`, already uses `name`.
pub(crate) async fn ensure_name_available<E, C>(
    db: &C,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<()>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let taken = E::find()
        .filter(E::name_key_column().eq(normalize_name(name)))
        .filter(E::lifecycle_column().eq(LifecycleState::Active))
        .apply_if(exclude_id, |query, id| query.filter(E::id_column().ne(id)))
        .one(db)
        .await?
        .is_some();

    if taken {
        return Err(Error::DuplicateName {
            kind: E::KIND.label(),
            name: name.trim().to_string(),
        });
    }
    Ok(())
}

async fn find_row<E, C>(db: &C, id: i64) -> Result<Option<E::Model>>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::id_column().eq(id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a row that must currently be in `state`, or fails with [`Error::NotFound`].
async fn find_in_state<E, C>(
    db: &C,
    id: i64,
    state: LifecycleState,
) -> Result<E::Model>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    find_row::<E, C>(db, id)
        .await?
        .filter(|model| E::snapshot(model).lifecycle == state)
        .ok_or_else(|| Error::not_found(E::KIND.label(), id))
}

/// Moves an active row to the archive.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager, or the row is a manager account
/// - `NotFound` if the row is missing or already archived
pub async fn archive_entity<E: SoftDelete>(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<()> {
    actor.require_manager(&format!("archive a {}", E::KIND))?;

    let txn = db.begin().await?;
    let model = find_in_state::<E, _>(&txn, id, LifecycleState::Active).await?;
    E::archive_guard(&model)?;
    let row = E::snapshot(&model);

    let now = Utc::now();
    E::update_many()
        .col_expr(E::lifecycle_column(), Expr::value(LifecycleState::Archived))
        .col_expr(E::deleted_at_column(), Expr::value(Some(now)))
        .col_expr(E::updated_at_column(), Expr::value(now))
        .filter(E::id_column().eq(id))
        .exec(&txn)
        .await?;

    let entry = NewTransaction::new(
        TransactionKind::Archive,
        actor.user_id,
        format!("Archived {} '{}'", E::KIND, row.name),
    );
    record(&txn, E::reference(entry, id)).await?;
    txn.commit().await?;

    info!(kind = %E::KIND, id, name = %row.name, actor = actor.user_id, "archived");
    Ok(())
}

/// Moves an archived row back to the active set.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `NotFound` if the row is missing or not archived
/// - `DuplicateName` if an active row of the same kind now holds its name
pub async fn restore_entity<E: SoftDelete>(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<()> {
    actor.require_manager(&format!("restore a {}", E::KIND))?;

    let txn = db.begin().await?;
    let model = find_in_state::<E, _>(&txn, id, LifecycleState::Archived).await?;
    let row = E::snapshot(&model);
    ensure_name_available::<E, _>(&txn, &row.name, Some(id)).await?;

    E::update_many()
        .col_expr(E::lifecycle_column(), Expr::value(LifecycleState::Active))
        .col_expr(
            E::deleted_at_column(),
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(E::updated_at_column(), Expr::value(Utc::now()))
        .filter(E::id_column().eq(id))
        .exec(&txn)
        .await?;

    let entry = NewTransaction::new(
        TransactionKind::Restore,
        actor.user_id,
        format!("Restored {} '{}'", E::KIND, row.name),
    );
    record(&txn, E::reference(entry, id)).await?;
    txn.commit().await?;

    info!(kind = %E::KIND, id, name = %row.name, actor = actor.user_id, "restored");
    Ok(())
}

/// Writes the purge record, then deletes the row. Runs inside the caller's unit and
/// returns the purged row's name.
async fn purge_in<E, C, F>(db: &C, actor: &Actor, id: i64, notes: F) -> Result<String>
where
    E: SoftDelete,
    C: ConnectionTrait,
    F: FnOnce(&str) -> String,
{
    let model = find_in_state::<E, _>(db, id, LifecycleState::Archived).await?;
    let name = E::snapshot(&model).name;

    let entry = NewTransaction::new(TransactionKind::Purge, actor.user_id, notes(&name));
    record(db, E::reference(entry, id)).await?;

    E::delete_many()
        .filter(E::id_column().eq(id))
        .exec(db)
        .await?;
    Ok(name)
}

/// Permanently removes an archived row.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `NotFound` if the row is missing or still active
pub async fn purge_entity<E: SoftDelete>(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<()> {
    actor.require_manager(&format!("purge a {}", E::KIND))?;

    let txn = db.begin().await?;
    let name = purge_in::<E, _, _>(&txn, actor, id, |name| {
        format!("Permanently deleted {} '{name}'", E::KIND)
    })
    .await?;
    txn.commit().await?;

    info!(kind = %E::KIND, id, name = %name, actor = actor.user_id, "purged");
    Ok(())
}

/// Days left before an archived row becomes eligible for the sweep, as of `now`.
/// Zero or negative means eligible.
#[must_use]
pub fn days_until_purge_at(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed_days = (now - deleted_at).num_seconds().div_euclid(SECONDS_PER_DAY);
    PURGE_RETENTION_DAYS - elapsed_days
}

/// Days left before an archived row becomes eligible for the sweep.
#[must_use]
pub fn days_until_purge(deleted_at: DateTime<Utc>) -> i64 {
    days_until_purge_at(deleted_at, Utc::now())
}

/// One row of the archive listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedEntry {
    /// Row id
    pub id: i64,
    /// Display name
    pub name: String,
    /// When the row was archived
    pub deleted_at: DateTime<Utc>,
    /// Days until the sweep may purge it
    pub days_until_purge: i64,
}

/// Lists archived rows of kind `E`, oldest archive first.
pub async fn list_archived_entities<E: SoftDelete>(
    db: &DatabaseConnection,
) -> Result<Vec<ArchivedEntry>> {
    let now = Utc::now();
    let rows = E::find()
        .filter(E::lifecycle_column().eq(LifecycleState::Archived))
        .order_by_asc(E::deleted_at_column())
        .all(db)
        .await?;

    Ok(rows
        .iter()
        .map(E::snapshot)
        .filter_map(|row| {
            let deleted_at = row.deleted_at?;
            Some(ArchivedEntry {
                id: row.id,
                name: row.name,
                deleted_at,
                days_until_purge: days_until_purge_at(deleted_at, now),
            })
        })
        .collect())
}

/// Outcome of one sweep over a kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Kind that was swept
    pub kind: EntityKind,
    /// Rows purged
    pub purged: usize,
    /// Rows that could not be purged, with the reason
    pub failed: Vec<(i64, String)>,
}

/// Purges every archived row of kind `E` whose archive is at least
/// [`PURGE_RETENTION_DAYS`] old. Each row is its own atomic unit, so one failure
/// does not stop the rest.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Storage` if the candidate rows cannot be listed
pub async fn sweep_expired_entities<E: SoftDelete>(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<SweepReport> {
    actor.require_manager(&format!("purge archived {}s", E::KIND))?;

    let cutoff = Utc::now() - Duration::days(PURGE_RETENTION_DAYS);
    let candidates: Vec<i64> = E::find()
        .filter(E::lifecycle_column().eq(LifecycleState::Archived))
        .filter(E::deleted_at_column().lte(cutoff))
        .all(db)
        .await?
        .iter()
        .map(|model| E::snapshot(model).id)
        .collect();

    let mut report = SweepReport {
        kind: E::KIND,
        purged: 0,
        failed: Vec::new(),
    };

    for id in candidates {
        match sweep_one::<E>(db, actor, id).await {
            Ok(name) => {
                info!(kind = %E::KIND, id, name = %name, "auto-purged");
                report.purged += 1;
            }
            Err(e) => {
                warn!(kind = %E::KIND, id, error = %e, "auto-purge failed");
                report.failed.push((id, e.to_string()));
            }
        }
    }

    Ok(report)
}

async fn sweep_one<E: SoftDelete>(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<String> {
    let txn = db.begin().await?;
    let name = purge_in::<E, _, _>(&txn, actor, id, |name| {
        format!(
            "Auto-deleted {} '{name}' after {PURGE_RETENTION_DAYS} days in archive",
            E::KIND
        )
    })
    .await?;
    txn.commit().await?;
    Ok(name)
}

/// Archives a row of the given kind.
pub async fn archive(db: &DatabaseConnection, actor: &Actor, kind: EntityKind, id: i64) -> Result<()> {
    match kind {
        EntityKind::Item => archive_entity::<Item>(db, actor, id).await,
        EntityKind::Recipe => archive_entity::<Recipe>(db, actor, id).await,
        EntityKind::User => archive_entity::<User>(db, actor, id).await,
    }
}

/// Restores a row of the given kind.
pub async fn restore(db: &DatabaseConnection, actor: &Actor, kind: EntityKind, id: i64) -> Result<()> {
    match kind {
        EntityKind::Item => restore_entity::<Item>(db, actor, id).await,
        EntityKind::Recipe => restore_entity::<Recipe>(db, actor, id).await,
        EntityKind::User => restore_entity::<User>(db, actor, id).await,
    }
}

/// Purges an archived row of the given kind.
pub async fn purge(db: &DatabaseConnection, actor: &Actor, kind: EntityKind, id: i64) -> Result<()> {
    match kind {
        EntityKind::Item => purge_entity::<Item>(db, actor, id).await,
        EntityKind::Recipe => purge_entity::<Recipe>(db, actor, id).await,
        EntityKind::User => purge_entity::<User>(db, actor, id).await,
    }
}

/// Lists archived rows of the given kind.
pub async fn list_archived(db: &DatabaseConnection, kind: EntityKind) -> Result<Vec<ArchivedEntry>> {
    match kind {
        EntityKind::Item => list_archived_entities::<Item>(db).await,
        EntityKind::Recipe => list_archived_entities::<Recipe>(db).await,
        EntityKind::User => list_archived_entities::<User>(db).await,
    }
}

/// Sweeps expired archived rows of the given kind.
pub async fn sweep_expired(
    db: &DatabaseConnection,
    actor: &Actor,
    kind: EntityKind,
) -> Result<SweepReport> {
    match kind {
        EntityKind::Item => sweep_expired_entities::<Item>(db, actor).await,
        EntityKind::Recipe => sweep_expired_entities::<Recipe>(db, actor).await,
        EntityKind::User => sweep_expired_entities::<User>(db, actor).await,
    }
}

/// Sweeps every kind, items first.
pub async fn sweep_all_expired(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<SweepReport>> {
    let mut reports = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        reports.push(sweep_expired(db, actor, kind).await?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{ledger, transaction};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Milk "), "milk");
        assert_eq!(normalize_name("Oat   MILK"), "oat milk");
        assert_eq!(normalize_name("\tEspresso Beans\n"), "espresso beans");
    }

    #[test]
    fn test_days_until_purge_boundaries() {
        let now = Utc::now();
        assert_eq!(days_until_purge_at(now, now), 30);
        assert_eq!(days_until_purge_at(now - Duration::hours(23), now), 30);
        assert_eq!(days_until_purge_at(now - Duration::days(29), now), 1);
        assert_eq!(days_until_purge_at(now - Duration::days(30), now), 0);
        assert_eq!(days_until_purge_at(now - Duration::days(31), now), -1);
    }

    #[tokio::test]
    async fn test_archive_restore_round_trip_keeps_stock() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(12.5)).await?;

        archive(&db, &manager, EntityKind::Item, milk.id).await?;
        let archived = fetch_item(&db, milk.id).await?;
        assert_eq!(archived.lifecycle, LifecycleState::Archived);
        assert!(archived.deleted_at.is_some());

        restore(&db, &manager, EntityKind::Item, milk.id).await?;
        let restored = fetch_item(&db, milk.id).await?;
        assert_eq!(restored.lifecycle, LifecycleState::Active);
        assert_eq!(restored.deleted_at, None);
        assert_eq!(restored.current_stock, dec!(12.5));

        let kinds: Vec<TransactionKind> = transaction::transactions_for_item(&db, milk.id)
            .await?
            .iter()
            .map(|t| t.transaction_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Restore,
                TransactionKind::Archive,
                TransactionKind::Added
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_archive_twice_is_not_found() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        archive(&db, &manager, EntityKind::Item, milk.id).await?;
        let result = archive(&db, &manager, EntityKind::Item, milk.id).await;
        assert!(matches!(result, Err(Error::NotFound { kind: "item", .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_restore_active_is_not_found() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        let result = restore(&db, &manager, EntityKind::Item, milk.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_purge_requires_archive_first() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        let result = purge(&db, &manager, EntityKind::Item, milk.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(Item::find_by_id(milk.id).one(&db).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_purge_removes_row_and_keeps_audit_record() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        archive(&db, &manager, EntityKind::Item, milk.id).await?;
        purge(&db, &manager, EntityKind::Item, milk.id).await?;

        assert!(Item::find_by_id(milk.id).one(&db).await?.is_none());

        let purges = transaction::list_transactions(
            &db,
            &transaction::TransactionFilter {
                kind: Some(TransactionKind::Purge),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(purges.len(), 1);
        assert_eq!(purges[0].item_id, None);
        assert!(purges[0].notes.contains("Milk"));

        Ok(())
    }

    #[tokio::test]
    async fn test_barista_cannot_archive() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let barista = create_barista(&db, "sam").await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        let result = archive(&db, &barista, EntityKind::Item, milk.id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_manager_account_cannot_be_archived() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let other_manager = insert_user(&db, "second-manager", Role::Manager).await?;

        let result = archive(&db, &manager, EntityKind::User, other_manager.user_id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let result = archive(&db, &manager, EntityKind::User, manager.user_id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_restore_rejects_name_taken_by_active_row() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let old_milk = create_test_item(&db, &manager, "Milk", dec!(1)).await?;
        archive(&db, &manager, EntityKind::Item, old_milk.id).await?;

        create_test_item(&db, &manager, "MILK", dec!(3)).await?;

        let result = restore(&db, &manager, EntityKind::Item, old_milk.id).await;
        assert!(matches!(result, Err(Error::DuplicateName { kind: "item", .. })));

        let still_archived = fetch_item(&db, old_milk.id).await?;
        assert_eq!(still_archived.lifecycle, LifecycleState::Archived);

        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_purges_only_expired_rows() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let old = create_test_item(&db, &manager, "Old Syrup", dec!(1)).await?;
        let recent = create_test_item(&db, &manager, "Recent Syrup", dec!(1)).await?;
        let active = create_test_item(&db, &manager, "Milk", dec!(1)).await?;

        archive(&db, &manager, EntityKind::Item, old.id).await?;
        archive(&db, &manager, EntityKind::Item, recent.id).await?;
        backdate_item_archive(&db, old.id, 31).await?;
        backdate_item_archive(&db, recent.id, 29).await?;

        let listing = list_archived(&db, EntityKind::Item).await?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, old.id);
        assert!(listing[0].days_until_purge <= 0);
        assert_eq!(listing[1].days_until_purge, 1);

        let report = sweep_expired(&db, &manager, EntityKind::Item).await?;
        assert_eq!(report.purged, 1);
        assert!(report.failed.is_empty());

        assert!(Item::find_by_id(old.id).one(&db).await?.is_none());
        assert!(Item::find_by_id(recent.id).one(&db).await?.is_some());
        assert!(Item::find_by_id(active.id).one(&db).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_all_reports_each_kind() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let barista = create_barista(&db, "sam").await?;
        archive(&db, &manager, EntityKind::User, barista.user_id).await?;
        backdate_user_archive(&db, barista.user_id, 40).await?;

        let reports = sweep_all_expired(&db, &manager).await?;
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].kind, EntityKind::Item);
        assert_eq!(reports[0].purged, 0);
        assert_eq!(reports[2].kind, EntityKind::User);
        assert_eq!(reports[2].purged, 1);
        assert!(User::find_by_id(barista.user_id).one(&db).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_archived_item_frees_its_name() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "milk", dec!(1)).await?;
        ledger::archive_item(&db, &manager, milk.id).await?;

        let replacement = create_test_item(&db, &manager, " Milk ", dec!(2)).await?;
        assert_eq!(replacement.name, "Milk");

        Ok(())
    }

    #[tokio::test]
    async fn test_name_key_follows_renames() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let oat = create_test_item(&db, &manager, " Oat   MILK ", dec!(1)).await?;
        assert_eq!(oat.name, "Oat   MILK");
        assert_eq!(oat.name_key, "oat milk");

        let input = item_input("Soy Milk", oat.category_id, oat.unit_id, dec!(1));
        let renamed = ledger::update_item(&db, &manager, oat.id, &input).await?;
        assert_eq!(renamed.name_key, "soy milk");

        // The old key is free again; the new one is taken.
        create_test_item(&db, &manager, "oat milk", dec!(1)).await?;
        let result = create_test_item(&db, &manager, "SOY  milk", dec!(1)).await;
        assert!(matches!(
            result,
            Err(Error::DuplicateName { kind: "item", .. })
        ));

        Ok(())
    }
}
