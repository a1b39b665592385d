//! Report generation business logic.
//!
//! This module provides the stock overview (items per status band plus the reorder list)
//! and usage summaries over the transaction log. All functions return structured data;
//! formatting is left to the caller apart from the small display helpers at the bottom.

use crate::{
    core::{
        ledger::{StockStatus, list_items},
        transaction::{TransactionFilter, list_transactions},
    },
    entities::{Item, TransactionKind},
    errors::Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::collections::HashMap;

/// One item that needs reordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderLine {
    /// Item to reorder
    pub item_id: i64,
    /// Item name
    pub name: String,
    /// Out or low
    pub status: StockStatus,
    /// Quantity on hand
    pub current_stock: Decimal,
    /// Quantity that brings the item back to its maximum
    pub suggested_quantity: Decimal,
    /// Unit name
    pub unit: String,
}

/// Overview of active stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    /// Active items with nothing on hand
    pub out: usize,
    /// Active items at or below their minimum
    pub low: usize,
    /// Active items at or below their midpoint
    pub medium: usize,
    /// Active items above their midpoint
    pub healthy: usize,
    /// Out or low items not already on order, most urgent first
    pub reorder: Vec<ReorderLine>,
}

/// Generates the stock overview.
///
/// Items already flagged as ordered are counted in their band but left off the
/// reorder list. The list is sorted by status (out before low), then by the share of
/// the minimum still on hand, then by name.
///
/// # Arguments
/// * `db` - Database connection
///
/// # Returns
/// A structured `StockReport`
pub async fn stock_report(db: &DatabaseConnection) -> Result<StockReport> {
    let items = list_items(db).await?;

    let mut report = StockReport {
        out: 0,
        low: 0,
        medium: 0,
        healthy: 0,
        reorder: Vec::new(),
    };
    for view in items {
        match view.status {
            StockStatus::Out => report.out += 1,
            StockStatus::Low => report.low += 1,
            StockStatus::Medium => report.medium += 1,
            StockStatus::Healthy => report.healthy += 1,
        }
        if matches!(view.status, StockStatus::Out | StockStatus::Low) && !view.item.ordered {
            report.reorder.push(ReorderLine {
                item_id: view.item.id,
                status: view.status,
                current_stock: view.item.current_stock,
                suggested_quantity: (view.item.maximum_stock - view.item.current_stock).max(Decimal::ZERO),
                unit: view.unit,
                name: view.item.name,
            });
        }
    }

    report.reorder.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| fill_ratio(a).cmp(&fill_ratio(b)))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(report)
}

fn fill_ratio(line: &ReorderLine) -> Decimal {
    let target = line.current_stock + line.suggested_quantity;
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    line.current_stock / target
}

/// Total usage of one item over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageLine {
    /// Item used, `None` once the item has been purged
    pub item_id: Option<i64>,
    /// Item name, or "(purged items)" once the item is gone
    pub item_name: String,
    /// Sum of logged usage quantities
    pub total_used: Decimal,
    /// Number of usage transactions
    pub entries: usize,
}

/// Aggregates `usage` transactions written at or after `since`, largest total first.
///
/// # Arguments
/// * `db` - Database connection
/// * `since` - Start of the period
///
/// # Returns
/// One `UsageLine` per item. Usage of purged items is folded into a single line with
/// no item id.
pub async fn usage_summary(db: &DatabaseConnection, since: DateTime<Utc>) -> Result<Vec<UsageLine>> {
    let rows = list_transactions(
        db,
        &TransactionFilter {
            kind: Some(TransactionKind::Usage),
            since: Some(since),
            ..Default::default()
        },
    )
    .await?;

    let names: HashMap<i64, String> = Item::find()
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect();

    let mut lines: Vec<UsageLine> = Vec::new();
    for row in rows {
        let quantity = row.quantity.unwrap_or_default();
        if let Some(line) = lines.iter_mut().find(|l| l.item_id == row.item_id) {
            line.total_used += quantity;
            line.entries += 1;
            continue;
        }
        let item_name = row
            .item_id
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_else(|| "(purged items)".to_string());
        lines.push(UsageLine {
            item_id: row.item_id,
            item_name,
            total_used: quantity,
            entries: 1,
        });
    }

    lines.sort_by(|a, b| {
        b.total_used
            .cmp(&a.total_used)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    Ok(lines)
}

/// Formats a quantity with its unit, rounded to three decimal places with trailing
/// zeros dropped.
///
/// # Arguments
/// * `value` - Quantity to display
/// * `unit` - Unit name, may be empty
///
/// # Returns
/// Formatted string like "2.5 kg" or "12 cups"
#[must_use]
pub fn format_quantity(value: Decimal, unit: &str) -> String {
    let rounded = value.round_dp(3).normalize();
    let number = if rounded.is_zero() {
        "0".to_string()
    } else {
        rounded.to_string()
    };
    if unit.is_empty() {
        number
    } else {
        format!("{number} {unit}")
    }
}

/// Short label for a status band, for list displays.
#[must_use]
pub const fn status_label(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Out => "OUT",
        StockStatus::Low => "LOW",
        StockStatus::Medium => "OK",
        StockStatus::Healthy => "GOOD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ledger, ordering, usage};
    use crate::test_utils::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(dec!(2.5), "kg"), "2.5 kg");
        assert_eq!(format_quantity(dec!(12.000), "cups"), "12 cups");
        assert_eq!(format_quantity(dec!(0.125), "l"), "0.125 l");
        assert_eq!(format_quantity(dec!(1) / dec!(3), "l"), "0.333 l");
        assert_eq!(format_quantity(dec!(-0.0001), ""), "0");
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(StockStatus::Out), "OUT");
        assert_eq!(status_label(StockStatus::Healthy), "GOOD");
    }

    #[tokio::test]
    async fn test_stock_report_counts_and_reorder_order() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        // min 10, max 50 for every test item
        create_test_item(&db, &manager, "Beans", dec!(45)).await?;
        create_test_item(&db, &manager, "Cups", dec!(20)).await?;
        let syrup = create_test_item(&db, &manager, "Syrup", dec!(8)).await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(2)).await?;
        let oat = create_test_item(&db, &manager, "Oat Milk", dec!(0)).await?;
        let lids = create_test_item(&db, &manager, "Lids", dec!(1)).await?;
        ordering::mark_ordered(&db, &manager, lids.id).await?;

        let report = stock_report(&db).await?;
        assert_eq!(report.out, 1);
        assert_eq!(report.low, 3);
        assert_eq!(report.medium, 1);
        assert_eq!(report.healthy, 1);

        let order: Vec<i64> = report.reorder.iter().map(|l| l.item_id).collect();
        assert_eq!(order, vec![oat.id, milk.id, syrup.id]);
        assert_eq!(report.reorder[0].suggested_quantity, dec!(50));
        assert_eq!(report.reorder[1].unit, TEST_UNIT);

        Ok(())
    }

    #[tokio::test]
    async fn test_usage_summary_aggregates_by_item() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let milk = create_test_item(&db, &manager, "Milk", dec!(20)).await?;
        let beans = create_test_item(&db, &manager, "Beans", dec!(20)).await?;
        let start = Utc::now() - Duration::seconds(1);

        for quantity in [dec!(1), dec!(2.5)] {
            usage::log_manual_usage(
                &db,
                &manager,
                &[usage::ManualUsageEntry {
                    item_id: Some(milk.id),
                    quantity,
                }],
                None,
            )
            .await?;
        }
        usage::log_manual_usage(
            &db,
            &manager,
            &[usage::ManualUsageEntry {
                item_id: Some(beans.id),
                quantity: dec!(0.5),
            }],
            None,
        )
        .await?;

        let summary = usage_summary(&db, start).await?;
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].item_name, "Milk");
        assert_eq!(summary[0].total_used, dec!(3.5));
        assert_eq!(summary[0].entries, 2);
        assert_eq!(summary[1].item_id, Some(beans.id));

        let later = usage_summary(&db, Utc::now() + Duration::hours(1)).await?;
        assert!(later.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_usage_summary_names_purged_items() -> Result<()> {
        let (db, manager) = setup_with_manager().await?;
        let syrup = create_test_item(&db, &manager, "Syrup", dec!(5)).await?;
        let start = Utc::now() - Duration::seconds(1);

        usage::log_manual_usage(
            &db,
            &manager,
            &[usage::ManualUsageEntry {
                item_id: Some(syrup.id),
                quantity: dec!(2),
            }],
            None,
        )
        .await?;
        ledger::archive_item(&db, &manager, syrup.id).await?;
        ledger::purge_item(&db, &manager, syrup.id).await?;

        let summary = usage_summary(&db, start).await?;
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].item_id, None);
        assert_eq!(summary[0].item_name, "(purged items)");
        assert_eq!(summary[0].total_used, dec!(2));

        Ok(())
    }
}
