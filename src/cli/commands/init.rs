//! Initialize the catalog database.
//!
//! Creates `~/.catalog-sync/data/catalog.db` (or the `--db` path) with the
//! full schema, and writes an empty `config.json` template next to it the
//! first time.

use crate::config::{Settings, config_path, resolve_db_path, save_config_to};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    recreated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if the database exists and `force`
/// is not set, or an error if the database cannot be created.
pub fn execute(db: Option<&Path>, settings: &Settings, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db, settings).ok_or_else(|| {
        Error::Config("Could not determine the catalog-sync directory".to_string())
    })?;

    let recreated = db_path.exists();
    if recreated {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Opening applies the schema.
    SqliteStorage::open(&db_path)?;

    // Template config only when using the default layout.
    let config = if db.is_none() {
        write_config_template()?
    } else {
        None
    };

    if json {
        let output = InitOutput {
            database: db_path,
            recreated,
            config,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        let verb = if recreated { "Recreated" } else { "Initialized" };
        println!("{verb} catalog database");
        println!("  Database: {}", db_path.display());
        if let Some(config) = config {
            println!("  Config:   {}", config.display());
        }
        println!();
        println!("Next: catalog-sync import --source <url-or-dir>");
    }

    Ok(())
}

/// Delete the database file and its WAL siblings.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut sibling = db_path.as_os_str().to_owned();
        sibling.push(suffix);
        let sibling = PathBuf::from(sibling);
        if sibling.exists() {
            fs::remove_file(sibling)?;
        }
    }
    Ok(())
}

/// Write an empty config file if none exists. Returns its path if written.
fn write_config_template() -> Result<Option<PathBuf>> {
    match config_path() {
        Some(path) if !path.exists() => {
            save_config_to(&path, &Settings::default())?;
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}
