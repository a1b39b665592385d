//! Unified error types for the inventory core.
//!
//! Every core operation fails with exactly one of the classified variants below.
//! Storage failures that the core does not interpret are carried opaquely in
//! [`Error::Storage`].

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// One ingredient's deficit found during a deduction pre-check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shortfall {
    /// Item that cannot cover the request
    pub item_id: i64,
    /// Item name at the time of the check
    pub item_name: String,
    /// Quantity the deduction needs
    pub required: Decimal,
    /// Quantity currently in stock
    pub available: Decimal,
    /// Unit name the quantities are expressed in
    pub unit: String,
}

/// Stable classification of [`Error`], for callers that map failures to their own
/// status conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// Name already held by an active row of the same kind
    DuplicateName,
    /// Entity absent or in the wrong lifecycle state
    NotFound,
    /// Deduction would drive stock negative
    InsufficientStock,
    /// Item is already flagged as ordered
    AlreadyOrdered,
    /// Role or ownership check failed
    Forbidden,
    /// Unclassified storage failure
    Storage,
    /// Configuration, credential or I/O failure outside the core taxonomy
    Internal,
}

/// Errors returned by the inventory core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// An active row of the same kind already uses this name.
    #[error("An active {kind} named '{name}' already exists")]
    DuplicateName {
        /// Entity kind (item, recipe, user, ...)
        kind: &'static str,
        /// Name as supplied by the caller
        name: String,
    },

    /// Entity is missing or not in the lifecycle state the operation requires.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind (item, recipe, user, ...)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// At least one item cannot cover the requested deduction.
    #[error("Insufficient stock for {} item(s)", shortfalls.len())]
    InsufficientStock {
        /// Every item that fell short
        shortfalls: Vec<Shortfall>,
    },

    /// Item is already flagged as on order.
    #[error("Item {item_id} is already marked as ordered")]
    AlreadyOrdered {
        /// Item that was already flagged
        item_id: i64,
    },

    /// The caller's role does not allow the operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Which check failed
        message: String,
    },

    /// Storage failure not interpreted by the core.
    #[error("Storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    /// Configuration file or environment problem.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Password hashing collaborator failed.
    #[error("Credential error: {message}")]
    Credential {
        /// What went wrong
        message: String,
    },

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] keyed by numeric id.
    #[must_use]
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::AlreadyOrdered { .. } => ErrorKind::AlreadyOrdered,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config { .. } | Self::Credential { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
