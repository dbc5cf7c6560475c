//! Import command implementation.

use super::existing_db_path;
use crate::cli::ImportArgs;
use crate::config::{
    Settings, resolve_credentials, resolve_file_name, resolve_match_policy, resolve_source,
    resolve_work_dir,
};
use crate::error::{Error, Result};
use crate::reconcile::RecordOutcome;
use crate::runner::{ImportOptions, RunSummary, run_import};
use crate::storage::RunStatus;
use crate::transfer::source_for;
use colored::Colorize;
use std::path::Path;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the database is not initialized, no source is
/// configured (and `--skip-fetch` is not set), or the run aborts.
pub fn execute(args: &ImportArgs, db: Option<&Path>, settings: &Settings, json: bool) -> Result<()> {
    let options = ImportOptions {
        db_path: existing_db_path(db, settings)?,
        file_name: resolve_file_name(args.file.as_deref(), settings)?,
        work_dir: resolve_work_dir(args.work_dir.as_deref(), settings)?,
        policy: resolve_match_policy(args.match_policy.as_deref(), settings)?,
    };

    let summary = if args.skip_fetch {
        run_import(None, &options)?
    } else {
        let location = resolve_source(args.source.as_deref(), settings).ok_or_else(|| {
            Error::Config(
                "no snapshot source: pass --source, set CATALOG_SYNC_SOURCE, or use --skip-fetch"
                    .to_string(),
            )
        })?;
        let source = source_for(&location, resolve_credentials(settings));
        run_import(Some(&*source), &options)?
    };

    print_summary(&summary, json)
}

/// Print a run summary as JSON or a human-readable report.
pub(super) fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    let report = &summary.report;
    let heading = match summary.status {
        RunStatus::Completed if report.is_noop() => "Catalog already up to date".green().bold(),
        RunStatus::Completed => "Catalog updated".green().bold(),
        RunStatus::Partial => "Catalog partially updated".yellow().bold(),
        RunStatus::Failed => "Catalog import failed".red().bold(),
    };
    println!("{heading}");
    println!("  Run:      {}", summary.run_id);
    println!("  Snapshot: {}", summary.path.display());
    println!("  Policy:   {}", summary.policy);
    println!();

    let labels = ["categories", "items", "category items", "pruned"];
    for (label, step) in labels.iter().zip(report.steps()) {
        let s = step.stats;
        println!(
            "  {label:<15} created {:>4}  deleted {:>4}  skipped {:>4}  failed {:>4}",
            s.created, s.deleted, s.skipped, s.failed
        );
    }

    if report.has_failures() {
        println!();
        println!("{}", "Failures".red().bold());
        for step in report.steps() {
            for record in &step.records {
                if let RecordOutcome::Failed { error } = &record.outcome {
                    println!("  {} {error}", "✗".red());
                }
            }
        }
    }

    Ok(())
}
