//! Lifecycle column shared by items, recipes and user accounts.
//!
//! A row is either `active` or `archived`; archived rows carry a `deleted_at`
//! timestamp. Purged rows no longer exist, so there is no stored `purged` value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored lifecycle state of a soft-deletable row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Visible and usable
    #[sea_orm(string_value = "active")]
    Active,
    /// Hidden, restorable, purged after the retention window
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl LifecycleState {
    /// Whether the row is in the active set
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}
