//! Team roster - manager and barista accounts.
//!
//! Passwords are hashed with Argon2id and a random salt. Neither the password nor its
//! hash is ever logged or returned (the hash is skipped when a user is serialized).

use crate::{
    core::{
        access::Actor,
        lifecycle::{self, EntityKind},
        transaction::{NewTransaction, record},
    },
    entities::{LifecycleState, Role, TransactionKind, User, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Credential {
            message: format!("failed to hash password: {e}"),
        })
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::validation("Username cannot be empty"));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }
    Ok(())
}

async fn find_active_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .filter(user::Column::Lifecycle.eq(LifecycleState::Active))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Inserts an account and its `added` record on `db`. With no `actor_id` (the
/// bootstrap manager) the record is attributed to the new account itself.
async fn insert_account<C>(
    db: &C,
    actor_id: Option<i64>,
    username: String,
    password: &str,
    role: Role,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    lifecycle::ensure_name_available::<User, _>(db, &username, None).await?;
    let password_hash = hash_password(password)?;

    let now = Utc::now();
    let created = user::ActiveModel {
        name_key: Set(lifecycle::normalize_name(&username)),
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(role),
        lifecycle: Set(LifecycleState::Active),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    record(
        db,
        NewTransaction::new(
            TransactionKind::Added,
            actor_id.unwrap_or(created.id),
            format!("Added {} account '{}'", created.role.label(), created.username),
        ),
    )
    .await?;
    Ok(created)
}

/// Creates a team account.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` for a blank username or empty password
/// - `DuplicateName` if an active account already has the username
/// - `Credential` if hashing fails
pub async fn create_user(
    db: &DatabaseConnection,
    actor: &Actor,
    username: &str,
    password: &str,
    role: Role,
) -> Result<user::Model> {
    actor.require_manager("add team members")?;
    let username = validate_username(username)?;
    validate_password(password)?;

    let txn = db.begin().await?;
    let created = insert_account(&txn, Some(actor.user_id), username, password, role).await?;
    txn.commit().await?;

    info!(user_id = created.id, username = %created.username, role = ?created.role, actor = actor.user_id, "user created");
    Ok(created)
}

/// Replaces an active account's password.
pub async fn change_password(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    new_password: &str,
) -> Result<()> {
    actor.require_manager("change passwords")?;
    validate_password(new_password)?;

    let txn = db.begin().await?;
    let existing = find_active_user(&txn, user_id).await?;
    let username = existing.username.clone();
    let mut active: user::ActiveModel = existing.into();
    active.password_hash = Set(hash_password(new_password)?);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Update,
            actor.user_id,
            format!("Changed password for '{username}'"),
        ),
    )
    .await?;
    txn.commit().await?;

    info!(user_id, actor = actor.user_id, "password changed");
    Ok(())
}

/// Changes an active account's username. The role is never editable.
pub async fn rename_user(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    username: &str,
) -> Result<user::Model> {
    actor.require_manager("rename team members")?;
    let username = validate_username(username)?;

    let txn = db.begin().await?;
    let existing = find_active_user(&txn, user_id).await?;
    lifecycle::ensure_name_available::<User, _>(&txn, &username, Some(user_id)).await?;

    let old = existing.username.clone();
    let mut active: user::ActiveModel = existing.into();
    active.name_key = Set(lifecycle::normalize_name(&username));
    active.username = Set(username);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    record(
        &txn,
        NewTransaction::new(
            TransactionKind::Update,
            actor.user_id,
            format!("Renamed account '{old}' to '{}'", updated.username),
        ),
    )
    .await?;
    txn.commit().await?;

    info!(user_id, actor = actor.user_id, "user renamed");
    Ok(updated)
}

/// Checks a username and password and stamps `last_login` on success.
///
/// # Errors
/// `Forbidden` for an unknown or archived account or a wrong password. The message does
/// not say which.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model> {
    let found = User::find()
        .filter(user::Column::NameKey.eq(lifecycle::normalize_name(username)))
        .filter(user::Column::Lifecycle.eq(LifecycleState::Active))
        .one(db)
        .await?;

    let Some(found) = found.filter(|u| verify_password(password, &u.password_hash)) else {
        debug!("authentication failed");
        return Err(Error::forbidden("invalid username or password"));
    };

    let mut active: user::ActiveModel = found.into();
    active.last_login = Set(Some(Utc::now()));
    let updated = active.update(db).await?;

    info!(user_id = updated.id, "user authenticated");
    Ok(updated)
}

/// Lists active accounts ordered by username.
pub async fn list_team(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::Lifecycle.eq(LifecycleState::Active))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Archives a barista account. Manager accounts are refused.
pub async fn archive_user(db: &DatabaseConnection, actor: &Actor, user_id: i64) -> Result<()> {
    lifecycle::archive(db, actor, EntityKind::User, user_id).await
}

/// Restores an archived account.
pub async fn restore_user(db: &DatabaseConnection, actor: &Actor, user_id: i64) -> Result<()> {
    lifecycle::restore(db, actor, EntityKind::User, user_id).await
}

/// Permanently deletes an archived account. Its log rows keep their notes.
pub async fn purge_user(db: &DatabaseConnection, actor: &Actor, user_id: i64) -> Result<()> {
    lifecycle::purge(db, actor, EntityKind::User, user_id).await
}

/// Creates the first manager account if no active manager exists, and returns the
/// active manager either way.
pub async fn ensure_bootstrap_manager(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let existing = User::find()
        .filter(user::Column::Lifecycle.eq(LifecycleState::Active))
        .filter(user::Column::Role.eq(Role::Manager))
        .order_by_asc(user::Column::Id)
        .one(&txn)
        .await?;
    if let Some(manager) = existing {
        debug!(user_id = manager.id, "manager account already present");
        return Ok(manager);
    }

    let username = validate_username(username)?;
    validate_password(password)?;
    let created = insert_account(&txn, None, username, password, Role::Manager).await?;
    txn.commit().await?;

    warn!(username = %created.username, "bootstrap manager account created");
    Ok(created)
}
