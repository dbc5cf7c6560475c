//! Import orchestration.
//!
//! One run is: fetch the snapshot (unless skipped), parse it, load the store
//! state, reconcile, and record the run in `sync_runs`. Start and end are
//! logged at warn level so they show with default verbosity.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::reconcile::{MatchPolicy, ReconcileReport, Reconciler};
use crate::snapshot::read_snapshot;
use crate::storage::{RunRecord, RunStatus, SqliteStorage};
use crate::transfer::SnapshotSource;

/// Inputs for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub db_path: PathBuf,
    pub file_name: String,
    pub work_dir: PathBuf,
    pub policy: MatchPolicy,
}

impl ImportOptions {
    /// Options for reconciling a snapshot file already on disk.
    #[must_use]
    pub fn for_file(db_path: &Path, snapshot_path: &Path, policy: MatchPolicy) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            file_name: snapshot_path
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            work_dir: snapshot_path
                .parent()
                .map_or_else(PathBuf::new, Path::to_path_buf),
            policy,
        }
    }

    /// Where the snapshot is read from.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.work_dir.join(&self.file_name)
    }
}

/// Result of a run that reached the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub path: PathBuf,
    pub digest: String,
    pub policy: MatchPolicy,
    pub report: ReconcileReport,
}

/// Run one import.
///
/// With `source` set, the snapshot is fetched into the work directory
/// first; with `None` the file already in the work directory is used.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the transfer fails, the
/// snapshot cannot be parsed, or the store state cannot be loaded.
/// Per-record failures do not error; they surface as
/// [`RunStatus::Partial`] in the summary.
pub fn run_import(source: Option<&dyn SnapshotSource>, options: &ImportOptions) -> Result<RunSummary> {
    warn!(
        file = %options.file_name,
        db = %options.db_path.display(),
        policy = %options.policy,
        "Catalog import started"
    );

    let outcome = import(source, options);

    match &outcome {
        Ok(summary) => warn!(
            run_id = %summary.run_id,
            status = summary.status.as_str(),
            created = summary.report.total_created(),
            deleted = summary.report.total_deleted(),
            failed = summary.report.total_failed(),
            "Catalog import finished"
        ),
        Err(e) => {
            error!(code = e.error_code().as_str(), error = %e, "Catalog import aborted");
            warn!(status = RunStatus::Failed.as_str(), "Catalog import finished");
        }
    }

    outcome
}

fn import(source: Option<&dyn SnapshotSource>, options: &ImportOptions) -> Result<RunSummary> {
    let mut storage = SqliteStorage::open(&options.db_path)?;
    let mut run = RunRecord::begin(&options.file_name);

    match fetch_and_reconcile(source, options, &mut storage, &mut run) {
        Ok((path, report)) => {
            let status = if report.has_failures() {
                RunStatus::Partial
            } else {
                RunStatus::Completed
            };
            run.created = report.total_created();
            run.deleted = report.total_deleted();
            run.failed = report.total_failed();
            if report.has_failures() {
                run.message = Some(format!("{} record(s) failed", run.failed));
            }
            let run = run.finish(status);
            record(&mut storage, &run);

            Ok(RunSummary {
                run_id: run.id,
                status,
                path,
                digest: run.snapshot_digest.unwrap_or_default(),
                policy: options.policy,
                report,
            })
        }
        Err(e) => {
            run.message = Some(e.to_string());
            record(&mut storage, &run.finish(RunStatus::Failed));
            Err(e)
        }
    }
}

fn fetch_and_reconcile(
    source: Option<&dyn SnapshotSource>,
    options: &ImportOptions,
    storage: &mut SqliteStorage,
    run: &mut RunRecord,
) -> Result<(PathBuf, ReconcileReport)> {
    let path = match source {
        Some(source) => {
            info!(source = %source.describe(), file = %options.file_name, "Fetching snapshot");
            source.fetch(&options.file_name, &options.work_dir)?
        }
        None => options.snapshot_path(),
    };

    let snapshot = read_snapshot(&path)?;
    info!(
        path = %path.display(),
        categories = snapshot.categories.len(),
        items = snapshot.items.len(),
        digest = %snapshot.digest,
        "Read snapshot"
    );
    run.snapshot_digest = Some(snapshot.digest);

    let report = Reconciler::new(storage, options.policy)
        .reconcile(&snapshot.categories, &snapshot.items)?;
    Ok((path, report))
}

/// History is best-effort; a failed insert is logged and ignored.
fn record(storage: &mut SqliteStorage, run: &RunRecord) {
    if let Err(e) = storage.record_run(run) {
        error!(run_id = %run.id, error = %e, "Failed to record run history");
    }
}
