//! Import run history.
//!
//! One row per `import`/`reconcile` run, written after the run finishes so
//! `status` can show what the last imports did.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every record was applied or skipped.
    Completed,
    /// The run finished but some records failed.
    Partial,
    /// The run aborted before or during reconciliation.
    Failed,
}

impl RunStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

fn parse_run_status(s: &str) -> RunStatus {
    match s {
        "completed" => RunStatus::Completed,
        "partial" => RunStatus::Partial,
        _ => RunStatus::Failed,
    }
}

/// A recorded run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub file_name: String,
    pub snapshot_digest: Option<String>,
    pub status: RunStatus,
    pub created: usize,
    pub deleted: usize,
    pub failed: usize,
    pub message: Option<String>,
    pub started_at: i64,
    pub finished_at: i64,
}

impl RunRecord {
    /// Start a new record; counts and status are filled in by the caller.
    #[must_use]
    pub fn begin(file_name: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: format!("run_{}", &uuid::Uuid::new_v4().to_string()[..12]),
            file_name: file_name.to_string(),
            snapshot_digest: None,
            status: RunStatus::Failed,
            created: 0,
            deleted: 0,
            failed: 0,
            message: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Stamp the finish time.
    #[must_use]
    pub fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self.finished_at = chrono::Utc::now().timestamp_millis();
        self
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

/// Insert a run into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_run(conn: &Connection, run: &RunRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_runs (id, file_name, snapshot_digest, status, created, deleted, failed, message, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            run.id,
            run.file_name,
            run.snapshot_digest,
            run.status.as_str(),
            to_i64(run.created),
            to_i64(run.deleted),
            to_i64(run.failed),
            run.message,
            run.started_at,
            run.finished_at,
        ],
    )?;
    Ok(())
}

/// Get the most recent runs, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_runs(conn: &Connection, limit: u32) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, file_name, snapshot_digest, status, created, deleted, failed, message, started_at, finished_at
         FROM sync_runs
         ORDER BY started_at DESC, rowid DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit], |row| {
        Ok(RunRecord {
            id: row.get(0)?,
            file_name: row.get(1)?,
            snapshot_digest: row.get(2)?,
            status: parse_run_status(row.get::<_, String>(3)?.as_str()),
            created: to_usize(row.get(4)?),
            deleted: to_usize(row.get(5)?),
            failed: to_usize(row.get(6)?),
            message: row.get(7)?,
            started_at: row.get(8)?,
            finished_at: row.get(9)?,
        })
    })?;

    rows.collect()
}
