//! Capability checks for the acting user.
//!
//! The authentication layer resolves the caller and hands an [`Actor`] to every core
//! operation. The core never inspects tokens; it only checks the role it was given.

use crate::{
    entities::Role,
    errors::{Error, Result},
};

/// The authenticated caller of a core operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Account performing the operation
    pub user_id: i64,
    /// Role the caller authenticated with
    pub role: Role,
}

impl Actor {
    /// Creates an actor from an authenticated user id and role.
    #[must_use]
    pub const fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the actor holds the manager capability
    #[must_use]
    pub const fn is_manager(&self) -> bool {
        matches!(self.role, Role::Manager)
    }

    /// Fails with [`Error::Forbidden`] unless the actor is a manager.
    pub fn require_manager(&self, action: &str) -> Result<()> {
        if self.is_manager() {
            Ok(())
        } else {
            tracing::debug!(user_id = self.user_id, action, "manager capability required");
            Err(Error::forbidden(format!("only managers may {action}")))
        }
    }
}

impl From<&crate::entities::UserModel> for Actor {
    fn from(user: &crate::entities::UserModel) -> Self {
        Self::new(user.id, user.role)
    }
}
