//! Command implementations.

pub mod catalog;
pub mod completions;
pub mod import;
pub mod init;
pub mod reconcile;
pub mod status;
pub mod version;

use crate::config::{Settings, resolve_db_path};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Resolve the database path and require that it has been initialized.
fn existing_db_path(explicit: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let db_path = resolve_db_path(explicit, settings).ok_or(Error::NotInitialized)?;
    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(db_path)
}
