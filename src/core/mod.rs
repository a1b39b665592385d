//! Core business logic - framework-agnostic operations over the inventory.
//!
//! Every operation takes a `&DatabaseConnection` and, where it mutates, the acting
//! [`access::Actor`]. Nothing here knows about HTTP or sessions.

/// Acting user and role checks
pub mod access;

/// Item CRUD, stock adjustments and derived status
pub mod ledger;

/// Archive, restore, purge and the retention sweep
pub mod lifecycle;

/// Ordered flag and restocking
pub mod ordering;

/// Recipes and their ingredient lists
pub mod recipe;

/// Categories and units
pub mod reference;

/// Stock overview and usage summaries
pub mod report;

/// Append-only transaction log
pub mod transaction;

/// Recipe and manual usage deduction
pub mod usage;

/// Team accounts and authentication
pub mod user;
