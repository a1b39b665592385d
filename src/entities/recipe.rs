//! Recipe entity - a named drink or dish whose servings deduct a fixed set of items.

use super::lifecycle::LifecycleState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique among active recipes
    pub name: String,
    /// Lowercased, whitespace-collapsed name used for uniqueness checks
    #[sea_orm(indexed)]
    #[serde(skip_serializing)]
    pub name_key: String,
    /// Active or archived
    pub lifecycle: LifecycleState,
    /// When the recipe was created
    pub created_at: DateTimeUtc,
    /// When the recipe was last modified
    pub updated_at: DateTimeUtc,
    /// When the recipe was archived, None while active
    pub deleted_at: Option<DateTimeUtc>,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One recipe owns many ingredient rows
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    Ingredients,
    /// One recipe is referenced by many usage transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredients.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
