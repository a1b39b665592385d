//! Transaction entity - immutable audit row for one stock- or entity-affecting event.
//!
//! References are nullable and set to NULL when the referenced row is purged, so the
//! audit row written just before a purge outlives it. The `notes` column always names
//! the entity involved.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What kind of event a transaction records
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Entity created; for items, quantity is the opening stock
    #[sea_orm(string_value = "added")]
    Added,
    /// Stock consumed; quantity is the amount deducted
    #[sea_orm(string_value = "usage")]
    Usage,
    /// Stock received; quantity is the amount added
    #[sea_orm(string_value = "restock")]
    Restock,
    /// Fields edited or a flag changed
    #[sea_orm(string_value = "update")]
    Update,
    /// Manual correction that removed stock
    #[sea_orm(string_value = "delete")]
    Delete,
    /// Entity moved to the archive
    #[sea_orm(string_value = "archive")]
    Archive,
    /// Entity moved back to the active set
    #[sea_orm(string_value = "restore")]
    Restore,
    /// Entity permanently removed
    #[sea_orm(string_value = "purge")]
    Purge,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item involved, if any
    pub item_id: Option<i64>,
    /// Recipe involved, if any
    pub recipe_id: Option<i64>,
    /// Acting user
    pub user_id: Option<i64>,
    /// Event kind
    pub transaction_type: TransactionKind,
    /// Quantity whose meaning depends on `transaction_type`
    pub quantity: Option<Decimal>,
    /// Human-readable description naming the entity
    pub notes: String,
    /// When the transaction was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Optional item reference
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "SetNull"
    )]
    Item,
    /// Optional recipe reference
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "SetNull"
    )]
    Recipe,
    /// Optional acting user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
