//! Reconcile command implementation.
//!
//! Runs the engine against a snapshot file already on disk. No transfer.

use super::existing_db_path;
use super::import::print_summary;
use crate::config::{Settings, resolve_match_policy};
use crate::error::{Error, Result};
use crate::runner::{ImportOptions, run_import};
use std::path::Path;

/// Execute the reconcile command.
///
/// # Errors
///
/// Returns an error if the database is not initialized, the snapshot path
/// is not a file, or the run aborts.
pub fn execute(
    path: &Path,
    match_policy: Option<&str>,
    db: Option<&Path>,
    settings: &Settings,
    json: bool,
) -> Result<()> {
    let db_path = existing_db_path(db, settings)?;
    if !path.is_file() {
        return Err(Error::Snapshot {
            path: path.to_path_buf(),
            message: "not a file".to_string(),
        });
    }
    let policy = resolve_match_policy(match_policy, settings)?;

    let options = ImportOptions::for_file(&db_path, path, policy);
    let summary = run_import(None, &options)?;
    print_summary(&summary, json)
}
