//! Bootstrap account configuration from environment variables.
//!
//! The first manager account is created from `CAFE_MANAGER_USERNAME` and
//! `CAFE_MANAGER_PASSWORD` when no active manager exists yet.

/// Credentials for the bootstrap manager account
#[derive(Clone)]
pub struct BootstrapManager {
    /// Login name
    pub username: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

impl std::fmt::Debug for BootstrapManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapManager")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reads the bootstrap manager credentials, if both variables are set and non-empty.
#[must_use]
pub fn bootstrap_manager() -> Option<BootstrapManager> {
    let username = std::env::var("CAFE_MANAGER_USERNAME").ok()?;
    let password = std::env::var("CAFE_MANAGER_PASSWORD").ok()?;
    if username.trim().is_empty() || password.is_empty() {
        return None;
    }
    Some(BootstrapManager { username, password })
}
