//! Status command implementation.

use super::existing_db_path;
use crate::config::Settings;
use crate::error::Result;
use crate::storage::{CatalogCounts, RunRecord, RunStatus, SqliteStorage};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    database: PathBuf,
    counts: CatalogCounts,
    runs: Vec<RunRecord>,
}

/// Execute status command.
///
/// # Errors
///
/// Returns an error if the database is not initialized or cannot be read.
pub fn execute(db: Option<&Path>, settings: &Settings, limit: u32, json: bool) -> Result<()> {
    let db_path = existing_db_path(db, settings)?;
    let storage = SqliteStorage::open(&db_path)?;
    let counts = storage.catalog_counts()?;
    let runs = storage.recent_runs(limit)?;

    if json {
        let output = StatusOutput {
            database: db_path,
            counts,
            runs,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Catalog".cyan().bold());
    println!("  Database:       {}", db_path.display());
    println!("  Categories:     {}", counts.categories);
    println!("  Items:          {}", counts.items);
    println!("  Category items: {}", counts.category_items);
    println!();

    println!("{}", "Recent runs".cyan().bold());
    if runs.is_empty() {
        println!("  No imports yet.");
        println!();
        println!("Run one with: catalog-sync import --source <url-or-dir>");
        return Ok(());
    }

    for run in &runs {
        let status = match run.status {
            RunStatus::Completed => run.status.as_str().green(),
            RunStatus::Partial => run.status.as_str().yellow(),
            RunStatus::Failed => run.status.as_str().red(),
        };
        println!(
            "  {}  {:<9}  {}  +{} -{} !{}",
            format_millis(run.started_at),
            status,
            run.file_name,
            run.created,
            run.deleted,
            run.failed
        );
        if let Some(message) = &run.message {
            println!("      {}", message.dimmed());
        }
    }

    Ok(())
}

fn format_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
