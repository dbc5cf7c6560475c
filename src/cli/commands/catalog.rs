//! Catalog command implementation.

use super::existing_db_path;
use crate::config::Settings;
use crate::error::Result;
use crate::storage::SqliteStorage;
use colored::Colorize;
use std::path::Path;

/// Print every category with the items placed under it.
///
/// # Errors
///
/// Returns an error if the database is not initialized or cannot be read.
pub fn execute(db: Option<&Path>, settings: &Settings, json: bool) -> Result<()> {
    let db_path = existing_db_path(db, settings)?;
    let storage = SqliteStorage::open(&db_path)?;
    let listing = storage.list_catalog()?;

    if json {
        println!("{}", serde_json::to_string(&listing)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("Catalog is empty.");
        return Ok(());
    }

    for category in &listing {
        println!(
            "{} {}",
            category.name.bold(),
            format!("({})", category.items.len()).dimmed()
        );
        for item in &category.items {
            println!("  - {item}");
        }
    }

    Ok(())
}
