//! Database schema definitions.
//!
//! The catalog lives in three relations (`categories`, `items`,
//! `category_items`). `sync_runs` keeps one row per import for `status`.

use rusqlite::{Connection, Result};

/// Current schema version, recorded in `schema_migrations`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the catalog database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds).
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Catalog
-- ====================

-- Categories: created on first sight, never deleted by an import
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Items: unique by name regardless of how many categories list them
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Category Items: current placement of an item under a category
CREATE TABLE IF NOT EXISTS category_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL,
    item_id INTEGER NOT NULL,
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (item_id) REFERENCES items(id),
    UNIQUE(category_id, item_id)
);

CREATE INDEX IF NOT EXISTS idx_category_items_item ON category_items(item_id);

-- ====================
-- Run History
-- ====================

CREATE TABLE IF NOT EXISTS sync_runs (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL,
    snapshot_digest TEXT,
    status TEXT NOT NULL CHECK (status IN ('completed', 'partial', 'failed')),
    created INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    message TEXT,
    started_at INTEGER NOT NULL,
    finished_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sync_runs_started ON sync_runs(started_at DESC);
";

/// Apply the schema to the database.
///
/// Idempotent: every statement uses `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}
