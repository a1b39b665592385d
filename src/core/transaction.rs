//! Transaction log - append-only audit trail of stock and lifecycle events.
//!
//! Rows are written only through [`record`], always on the same connection (usually an
//! open database transaction) as the mutation they describe, so a failed log write rolls
//! the mutation back with it. Nothing in the crate updates or deletes a logged row.

use crate::{
    entities::{Transaction, TransactionKind, transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, QueryTrait, Set, prelude::*};

/// A transaction row about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Event kind
    pub kind: TransactionKind,
    /// Item involved, if any
    pub item_id: Option<i64>,
    /// Recipe involved, if any
    pub recipe_id: Option<i64>,
    /// Acting user
    pub user_id: Option<i64>,
    /// Quantity, meaning depends on `kind`
    pub quantity: Option<Decimal>,
    /// Human-readable description naming the entity
    pub notes: String,
}

impl NewTransaction {
    /// Starts a row of the given kind performed by `user_id`.
    pub fn new(kind: TransactionKind, user_id: i64, notes: impl Into<String>) -> Self {
        Self {
            kind,
            item_id: None,
            recipe_id: None,
            user_id: Some(user_id),
            quantity: None,
            notes: notes.into(),
        }
    }

    /// References an item.
    #[must_use]
    pub const fn item(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// References a recipe.
    #[must_use]
    pub const fn recipe(mut self, recipe_id: i64) -> Self {
        self.recipe_id = Some(recipe_id);
        self
    }

    /// Attaches a quantity.
    #[must_use]
    pub const fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Appends one row to the log on `db`, which should be the caller's open transaction.
pub(crate) async fn record<C>(db: &C, entry: NewTransaction) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let row = transaction::ActiveModel {
        item_id: Set(entry.item_id),
        recipe_id: Set(entry.recipe_id),
        user_id: Set(entry.user_id),
        transaction_type: Set(entry.kind),
        quantity: Set(entry.quantity),
        notes: Set(entry.notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Optional constraints for [`list_transactions`]. The default matches every row.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Only rows referencing this item
    pub item_id: Option<i64>,
    /// Only rows referencing this recipe
    pub recipe_id: Option<i64>,
    /// Only rows performed by this user
    pub user_id: Option<i64>,
    /// Only rows of this kind
    pub kind: Option<TransactionKind>,
    /// Only rows written at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of rows
    pub limit: Option<u64>,
}

/// Lists transactions matching `filter`, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .apply_if(filter.item_id, |q, id| {
            q.filter(transaction::Column::ItemId.eq(id))
        })
        .apply_if(filter.recipe_id, |q, id| {
            q.filter(transaction::Column::RecipeId.eq(id))
        })
        .apply_if(filter.user_id, |q, id| {
            q.filter(transaction::Column::UserId.eq(id))
        })
        .apply_if(filter.kind, |q, kind| {
            q.filter(transaction::Column::TransactionType.eq(kind))
        })
        .apply_if(filter.since, |q, since| {
            q.filter(transaction::Column::CreatedAt.gte(since))
        })
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .limit(filter.limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all transactions for one item, newest first.
pub async fn transactions_for_item(
    db: &DatabaseConnection,
    item_id: i64,
) -> Result<Vec<transaction::Model>> {
    list_transactions(
        db,
        &TransactionFilter {
            item_id: Some(item_id),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_record_and_list_newest_first() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;

        let first = record(
            &db,
            NewTransaction::new(TransactionKind::Update, manager.user_id, "first"),
        )
        .await?;
        let second = record(
            &db,
            NewTransaction::new(TransactionKind::Update, manager.user_id, "second").quantity(dec!(2.5)),
        )
        .await?;

        let rows = list_transactions(
            &db,
            &TransactionFilter {
                kind: Some(TransactionKind::Update),
                ..Default::default()
            },
        )
        .await?;
        let ids: Vec<i64> = rows.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(rows[0].quantity, Some(dec!(2.5)));
        assert_eq!(rows[0].user_id, Some(manager.user_id));

        Ok(())
    }

    #[tokio::test]
    async fn test_transactions_for_item_only_returns_that_item() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(10)).await?;
        let beans = create_test_item(&db, &manager, "Beans", dec!(5)).await?;

        let milk_rows = transactions_for_item(&db, milk.id).await?;
        assert_eq!(milk_rows.len(), 1);
        assert_eq!(milk_rows[0].transaction_type, TransactionKind::Added);
        assert_eq!(milk_rows[0].quantity, Some(dec!(10)));

        let beans_rows = transactions_for_item(&db, beans.id).await?;
        assert_eq!(beans_rows.len(), 1);
        assert_eq!(beans_rows[0].item_id, Some(beans.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_filter_limit() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        for n in 0..5 {
            record(
                &db,
                NewTransaction::new(TransactionKind::Update, manager.user_id, format!("row {n}")),
            )
            .await?;
        }

        let rows = list_transactions(
            &db,
            &TransactionFilter {
                limit: Some(3),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].notes, "row 4");

        Ok(())
    }
}
