//! User entity - a team member account (manager or barista).

use super::lifecycle::LifecycleState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role, fixed at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: stock, recipes, team
    #[sea_orm(string_value = "manager")]
    Manager,
    /// Reads and usage logging only
    #[sea_orm(string_value = "barista")]
    Barista,
}

impl Role {
    /// Lowercase label, matching the stored value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Barista => "barista",
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique among active accounts
    pub username: String,
    /// Lowercased, whitespace-collapsed username used for uniqueness checks
    #[sea_orm(indexed)]
    #[serde(skip_serializing)]
    pub name_key: String,
    /// Argon2id PHC string; never returned to callers
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Manager or barista
    pub role: Role,
    /// Active or archived
    pub lifecycle: LifecycleState,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account was last modified
    pub updated_at: DateTimeUtc,
    /// Last successful authentication
    pub last_login: Option<DateTimeUtc>,
    /// When the account was archived, None while active
    pub deleted_at: Option<DateTimeUtc>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user acts in many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
