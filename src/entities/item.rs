//! Item entity - one stocked ingredient or supply.
//!
//! `current_stock` is written only by the stock ledger in `core::ledger`. The stock
//! status shown to users is derived from the three stock columns and never stored.
//! Quantities are exact decimals.

use super::lifecycle::LifecycleState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique among active items ignoring case and surrounding whitespace
    pub name: String,
    /// Lowercased, whitespace-collapsed name used for uniqueness checks
    #[sea_orm(indexed)]
    #[serde(skip_serializing)]
    pub name_key: String,
    /// Category this item is filed under
    pub category_id: i64,
    /// Unit the stock columns are measured in
    pub unit_id: i64,
    /// Quantity on hand, never negative
    pub current_stock: Decimal,
    /// Reorder threshold
    pub minimum_stock: Decimal,
    /// Target stock level, never below `minimum_stock`
    pub maximum_stock: Decimal,
    /// Whether a manager has flagged this item as on order
    pub ordered: bool,
    /// Free-text description
    pub description: Option<String>,
    /// Active or archived
    pub lifecycle: LifecycleState,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
    /// When the item was archived, None while active
    pub deleted_at: Option<DateTimeUtc>,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,
    /// Each item is measured in one unit
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::UnitId",
        to = "super::unit::Column::Id",
        on_delete = "Restrict"
    )]
    Unit,
    /// One item appears in many recipes
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
    /// One item has many ledger transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unit.def()
    }
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
