/// Database configuration and connection management
pub mod database;

/// Category and unit reference data from config.toml
pub mod reference;

/// Bootstrap manager account from environment variables
pub mod users;
