//! Recipe deduction engine - turns "N servings of a recipe" or a manual list of
//! (item, quantity) pairs into one all-or-nothing multi-item stock deduction.
//!
//! Both entry points run in two phases inside a single database transaction:
//!
//! 1. **Pre-check**: every requirement is compared against current stock and all
//!    shortfalls are collected. Any shortfall fails the whole request.
//! 2. **Apply**: each item is deducted through the ledger's conditional update. If a
//!    concurrent request drained an item between the phases, that write fails and
//!    the whole transaction rolls back.

use crate::{
    core::{
        access::Actor,
        ledger::{apply_adjustment, find_active_item, round_quantity},
        transaction::NewTransaction,
    },
    entities::{
        Item, LifecycleState, Recipe, RecipeIngredient, TransactionKind, Unit, item, recipe,
        recipe_ingredient,
    },
    errors::{Error, Result, Shortfall},
};
use rust_decimal::Decimal;
use sea_orm::{TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One line of a manual usage request
#[derive(Debug, Clone, Deserialize)]
pub struct ManualUsageEntry {
    /// Item to deduct from; `None` when the caller omitted it
    pub item_id: Option<i64>,
    /// Quantity used, must be positive
    pub quantity: Decimal,
}

/// One item's deduction in a committed usage request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deduction {
    /// Item deducted from
    pub item_id: i64,
    /// Item name
    pub item_name: String,
    /// Quantity removed
    pub quantity: Decimal,
    /// Stock left afterwards
    pub remaining: Decimal,
    /// Unit name
    pub unit: String,
}

/// Result of a committed usage request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageOutcome {
    /// Number of items whose stock changed
    pub items_updated: usize,
    /// Per-item detail, in request order
    pub deductions: Vec<Deduction>,
}

struct Requirement {
    item: item::Model,
    required: Decimal,
}

/// Adds `quantity` to the requirement for `item`, merging repeated items.
fn push_requirement(requirements: &mut Vec<Requirement>, item: item::Model, quantity: Decimal) {
    let quantity = round_quantity(quantity);
    if let Some(existing) = requirements.iter_mut().find(|r| r.item.id == item.id) {
        existing.required += quantity;
    } else {
        requirements.push(Requirement {
            item,
            required: quantity,
        });
    }
}

fn find_shortfalls(requirements: &[Requirement], units: &HashMap<i64, String>) -> Vec<Shortfall> {
    requirements
        .iter()
        .filter(|r| r.item.current_stock < r.required)
        .map(|r| Shortfall {
            item_id: r.item.id,
            item_name: r.item.name.clone(),
            required: r.required,
            available: r.item.current_stock,
            unit: units.get(&r.item.unit_id).cloned().unwrap_or_default(),
        })
        .collect()
}

async fn unit_names<C>(db: &C) -> Result<HashMap<i64, String>>
where
    C: ConnectionTrait,
{
    Ok(Unit::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

/// Runs the pre-check and apply phases on `txn`. `entry_for` builds the log row for
/// each requirement.
async fn deduct_all<C, F>(
    txn: &C,
    requirements: Vec<Requirement>,
    entry_for: F,
) -> Result<Vec<Deduction>>
where
    C: ConnectionTrait,
    F: Fn(&Requirement, &str) -> NewTransaction,
{
    let units = unit_names(txn).await?;

    let shortfalls = find_shortfalls(&requirements, &units);
    if !shortfalls.is_empty() {
        debug!(count = shortfalls.len(), "usage rejected by pre-check");
        return Err(Error::InsufficientStock { shortfalls });
    }

    let mut deductions = Vec::with_capacity(requirements.len());
    for requirement in &requirements {
        let unit = units
            .get(&requirement.item.unit_id)
            .cloned()
            .unwrap_or_default();
        let entry = entry_for(requirement, &unit).quantity(requirement.required);
        let updated =
            apply_adjustment(txn, requirement.item.id, -requirement.required, entry).await?;
        deductions.push(Deduction {
            item_id: updated.id,
            item_name: updated.name,
            quantity: requirement.required,
            remaining: updated.current_stock,
            unit,
        });
    }
    Ok(deductions)
}

/// Deducts `servings` servings of a recipe from stock, one `usage` transaction per
/// ingredient. Any role may log usage.
///
/// # Errors
/// - `Validation` if `servings` is not a positive number
/// - `NotFound` if the recipe is missing or archived, or has no active ingredients
/// - `InsufficientStock` listing every short ingredient; no stock changes
pub async fn log_recipe_usage(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i64,
    servings: Decimal,
) -> Result<UsageOutcome> {
    let servings = round_quantity(servings);
    if servings <= Decimal::ZERO {
        return Err(Error::validation("servings must be greater than zero"));
    }

    let txn = db.begin().await?;
    let recipe: recipe::Model = Recipe::find_by_id(recipe_id)
        .filter(recipe::Column::Lifecycle.eq(LifecycleState::Active))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("recipe", recipe_id))?;

    let ingredients = RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .find_also_related(Item)
        .all(&txn)
        .await?;

    let mut requirements = Vec::with_capacity(ingredients.len());
    for (ingredient, item) in ingredients {
        if let Some(item) = item.filter(|i| i.lifecycle.is_active()) {
            push_requirement(
                &mut requirements,
                item,
                ingredient.quantity_required * servings,
            );
        }
    }
    if requirements.is_empty() {
        return Err(Error::NotFound {
            kind: "active ingredients for recipe",
            id: recipe_id.to_string(),
        });
    }

    let deductions = deduct_all(&txn, requirements, |r, unit| {
        NewTransaction::new(
            TransactionKind::Usage,
            actor.user_id,
            format!(
                "Used {} {unit} of '{}' for {servings} x '{}'",
                r.required, r.item.name, recipe.name
            ),
        )
        .recipe(recipe.id)
    })
    .await?;
    txn.commit().await?;

    info!(
        recipe_id,
        %servings,
        items = deductions.len(),
        actor = actor.user_id,
        "recipe usage logged"
    );
    Ok(UsageOutcome {
        items_updated: deductions.len(),
        deductions,
    })
}

/// Deducts an arbitrary list of (item, quantity) pairs, all or nothing. Repeated
/// items are merged into one deduction. Any role may log usage.
///
/// # Errors
/// - `Validation` for an empty list, a missing `item_id`, or a non-positive quantity
/// - `NotFound` if any item is missing or archived (checked before stock)
/// - `InsufficientStock` listing every short item; no stock changes
pub async fn log_manual_usage(
    db: &DatabaseConnection,
    actor: &Actor,
    entries: &[ManualUsageEntry],
    notes: Option<&str>,
) -> Result<UsageOutcome> {
    if entries.is_empty() {
        return Err(Error::validation("at least one item is required"));
    }
    let mut lines = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let item_id = entry
            .item_id
            .ok_or_else(|| Error::validation(format!("entry {index} is missing item_id")))?;
        if round_quantity(entry.quantity) <= Decimal::ZERO {
            return Err(Error::validation(format!(
                "entry {index} must have a positive quantity"
            )));
        }
        lines.push((item_id, entry.quantity));
    }
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    let txn = db.begin().await?;
    let mut requirements = Vec::with_capacity(lines.len());
    for (item_id, quantity) in lines {
        let item = find_active_item(&txn, item_id).await?;
        push_requirement(&mut requirements, item, quantity);
    }

    let deductions = deduct_all(&txn, requirements, |r, unit| {
        let text = notes.map_or_else(
            || format!("Used {} {unit} of '{}'", r.required, r.item.name),
            ToString::to_string,
        );
        NewTransaction::new(TransactionKind::Usage, actor.user_id, text)
    })
    .await?;
    txn.commit().await?;

    info!(items = deductions.len(), actor = actor.user_id, "manual usage logged");
    Ok(UsageOutcome {
        items_updated: deductions.len(),
        deductions,
    })
}
