//! Maintenance runner: prepares the database and runs the archive retention sweep.
//!
//! Meant to be run on startup and from a daily scheduler.

use cafe_inventory::{
    config::{database, reference, users},
    core::{
        access::Actor, lifecycle, reference::seed_reference_data, user::ensure_bootstrap_manager,
    },
    entities::{LifecycleState, Role, User, UserModel, user},
    errors::Result,
};
use dotenvy::dotenv;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn find_manager(db: &DatabaseConnection) -> Result<Option<UserModel>> {
    // Prefer the configured bootstrap account; otherwise any active manager.
    if let Some(bootstrap) = users::bootstrap_manager() {
        return ensure_bootstrap_manager(db, &bootstrap.username, &bootstrap.password)
            .await
            .map(Some);
    }
    Ok(User::find()
        .filter(user::Column::Role.eq(Role::Manager))
        .filter(user::Column::Lifecycle.eq(LifecycleState::Active))
        .order_by_asc(user::Column::Id)
        .one(db)
        .await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Connect and create tables
    if std::env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?; // Default database lives in ./data
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed categories and units from config.toml
    let config = reference::load_default_config()?;
    seed_reference_data(&db, &config)
        .await
        .inspect_err(|e| error!("Failed to seed reference data: {}", e))?;

    // 5. Sweep expired archives as a manager
    let Some(manager) = find_manager(&db).await? else {
        warn!(
            "No manager account exists; set CAFE_MANAGER_USERNAME and CAFE_MANAGER_PASSWORD to create one. Skipping sweep."
        );
        return Ok(());
    };
    let actor = Actor::from(&manager);

    let reports = lifecycle::sweep_all_expired(&db, &actor).await?;
    for report in &reports {
        info!(
            kind = %report.kind,
            purged = report.purged,
            failed = report.failed.len(),
            "retention sweep finished"
        );
    }

    Ok(())
}
