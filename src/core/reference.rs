//! Reference data - categories and units items are filed under and measured in.

use crate::{
    config::reference::Config,
    core::{access::Actor, lifecycle::normalize_name},
    entities::{Category, Unit, category, unit},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Lists every category ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every unit ordered by name.
pub async fn list_units(db: &DatabaseConnection) -> Result<Vec<unit::Model>> {
    Unit::find()
        .order_by_asc(unit::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

fn clean_name(kind: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{kind} name cannot be empty")));
    }
    Ok(name.to_string())
}

fn name_taken<'a>(existing: impl IntoIterator<Item = &'a str>, name: &str) -> bool {
    let key = normalize_name(name);
    existing.into_iter().any(|n| normalize_name(n) == key)
}

/// Adds a category.
///
/// # Errors
/// - `Forbidden` if the actor is not a manager
/// - `Validation` for a blank name
/// - `DuplicateName` if a category already has the name, ignoring case
pub async fn create_category(
    db: &DatabaseConnection,
    actor: &Actor,
    name: &str,
) -> Result<category::Model> {
    actor.require_manager("add categories")?;
    let name = clean_name("Category", name)?;

    let existing = Category::find().all(db).await?;
    if name_taken(existing.iter().map(|c| c.name.as_str()), &name) {
        return Err(Error::DuplicateName {
            kind: "category",
            name,
        });
    }

    let created = category::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(category_id = created.id, name = %created.name, actor = actor.user_id, "category created");
    Ok(created)
}

/// Adds a unit.
///
/// # Errors
/// Same as [`create_category`].
pub async fn create_unit(db: &DatabaseConnection, actor: &Actor, name: &str) -> Result<unit::Model> {
    actor.require_manager("add units")?;
    let name = clean_name("Unit", name)?;

    let existing = Unit::find().all(db).await?;
    if name_taken(existing.iter().map(|u| u.name.as_str()), &name) {
        return Err(Error::DuplicateName { kind: "unit", name });
    }

    let created = unit::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(unit_id = created.id, name = %created.name, actor = actor.user_id, "unit created");
    Ok(created)
}

/// Inserts the categories and units named in the configuration that do not exist yet.
/// Existing rows are never modified, so this is safe to run on every startup.
///
/// Returns the number of (categories, units) inserted.
pub async fn seed_reference_data(db: &DatabaseConnection, config: &Config) -> Result<(usize, usize)> {
    let mut known: Vec<String> = Category::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let mut categories = 0;
    for entry in &config.categories {
        let Ok(name) = clean_name("Category", &entry.name) else {
            continue;
        };
        if name_taken(known.iter().map(String::as_str), &name) {
            continue;
        }
        category::ActiveModel {
            name: Set(name.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        known.push(name);
        categories += 1;
    }

    let mut known: Vec<String> = Unit::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| u.name)
        .collect();
    let mut units = 0;
    for entry in &config.units {
        let Ok(name) = clean_name("Unit", &entry.name) else {
            continue;
        };
        if name_taken(known.iter().map(String::as_str), &name) {
            continue;
        }
        unit::ActiveModel {
            name: Set(name.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        known.push(name);
        units += 1;
    }

    if categories + units > 0 {
        info!(categories, units, "seeded reference data");
    }
    Ok((categories, units))
}
