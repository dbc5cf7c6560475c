//! SQLite storage implementation.
//!
//! [`SqliteStorage`] is the store accessor the engine runs against, plus the
//! read-side queries used by `status` and `catalog`. Every statement runs in
//! autocommit mode, so each insert or delete commits on its own.

use crate::error::{Error, Result};
use crate::storage::accessor::{Column, Filter, Relation, Row, StoreAccessor, Value};
use crate::storage::runs::{self, RunRecord};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Row counts per catalog relation.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogCounts {
    pub categories: usize,
    pub items: usize,
    pub category_items: usize,
}

/// A category with the names of the items currently placed under it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryListing {
    pub id: i64,
    pub name: String,
    pub items: Vec<String>,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the connection cannot be
    /// established or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the connection cannot be
    /// established or the schema cannot be applied.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let unavailable = |e: rusqlite::Error| Error::StoreUnavailable {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let conn = Connection::open(path).map_err(unavailable)?;
        let timeout = timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis);
        conn.busy_timeout(timeout).map_err(unavailable)?;
        apply_schema(&conn).map_err(unavailable)?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ==================
    // Read-side queries
    // ==================

    /// Count rows in each catalog relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn catalog_counts(&self) -> Result<CatalogCounts> {
        let count = |relation: Relation| -> Result<usize> {
            let sql = format!("SELECT COUNT(*) FROM {}", relation.table());
            let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };

        Ok(CatalogCounts {
            categories: count(Relation::Categories)?,
            items: count(Relation::Items)?,
            category_items: count(Relation::CategoryItems)?,
        })
    }

    /// List every category with its current items, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_catalog(&self) -> Result<Vec<CategoryListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, i.name
             FROM categories c
             LEFT JOIN category_items ci ON ci.category_id = c.id
             LEFT JOIN items i ON i.id = ci.item_id
             ORDER BY c.name ASC, i.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut listing: Vec<CategoryListing> = Vec::new();
        for row in rows {
            let (id, name, item) = row?;
            match listing.last_mut() {
                Some(last) if last.id == id => last.items.extend(item),
                _ => listing.push(CategoryListing {
                    id,
                    name,
                    items: item.into_iter().collect(),
                }),
            }
        }
        Ok(listing)
    }

    // ==================
    // Run History
    // ==================

    /// Record a finished import run.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record_run(&mut self, run: &RunRecord) -> Result<()> {
        runs::insert_run(&self.conn, run)?;
        Ok(())
    }

    /// Most recent runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        Ok(runs::recent_runs(&self.conn, limit)?)
    }
}

/// Reject columns that do not belong to `relation`.
fn check_columns(relation: Relation, columns: impl IntoIterator<Item = Column>) -> Result<()> {
    for column in columns {
        if !relation.has_column(column) {
            return Err(Error::InvalidArgument(format!(
                "column '{column}' does not exist on '{relation}'"
            )));
        }
    }
    Ok(())
}

/// Build ` WHERE a = ?1 AND b = ?2` and the matching parameter list.
fn where_clause(filter: &Filter) -> (String, Vec<&Value>) {
    if filter.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut parts = Vec::new();
    let mut values = Vec::new();
    for (i, (column, value)) in filter.conditions().enumerate() {
        parts.push(format!("{column} = ?{}", i + 1));
        values.push(value);
    }
    (format!(" WHERE {}", parts.join(" AND ")), values)
}

impl StoreAccessor for SqliteStorage {
    fn get(&self, relation: Relation, filter: &Filter) -> Result<Vec<Row>> {
        check_columns(relation, filter.conditions().map(|(c, _)| *c))?;

        let columns = relation.columns();
        let select_list = columns
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join(", ");
        let (where_sql, values) = where_clause(filter);
        let sql = format!(
            "SELECT {select_list} FROM {}{where_sql} ORDER BY id ASC",
            relation.table()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let mut out = Row::new();
            for (i, column) in columns.iter().enumerate() {
                out.set(*column, row.get::<_, Value>(i)?);
            }
            Ok(out)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn write(&mut self, relation: Relation, rows: &[Row]) -> Result<usize> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        if first.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "cannot insert an empty row into '{relation}'"
            )));
        }

        let columns: Vec<Column> = first.columns().collect();
        check_columns(relation, columns.iter().copied())?;
        if let Some(pos) = rows
            .iter()
            .position(|r| !r.columns().eq(columns.iter().copied()))
        {
            return Err(Error::InvalidArgument(format!(
                "row {pos} of batch into '{relation}' has a different column set"
            )));
        }

        let width = columns.len();
        let tuples = (0..rows.len())
            .map(|r| {
                let slots = (1..=width)
                    .map(|c| format!("?{}", r * width + c))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({slots})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = columns
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({column_list}) VALUES {tuples}",
            relation.table()
        );

        let inserted = self
            .conn
            .execute(&sql, params_from_iter(rows.iter().flat_map(Row::values)))?;
        Ok(inserted)
    }

    fn delete(&mut self, relation: Relation, filter: &Filter) -> Result<usize> {
        if filter.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "refusing to delete from '{relation}' without a filter"
            )));
        }
        check_columns(relation, filter.conditions().map(|(c, _)| *c))?;

        let (where_sql, values) = where_clause(filter);
        let sql = format!("DELETE FROM {}{where_sql}", relation.table());
        let deleted = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Row {
        Row::new().with(Column::Name, name)
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_write_and_get_with_filter() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let n = storage
            .write(Relation::Categories, &[named("Drinks"), named("Snacks")])
            .unwrap();
        assert_eq!(n, 2);

        let all = storage.get(Relation::Categories, &Filter::all()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text(Column::Name), Some("Drinks"));
        assert_eq!(all[0].int(Column::Id), Some(1));

        let snacks = storage
            .get(Relation::Categories, &Filter::eq(Column::Name, "Snacks"))
            .unwrap();
        assert_eq!(snacks.len(), 1);
        assert_eq!(snacks[0].int(Column::Id), Some(2));
    }

    #[test]
    fn test_filter_is_and_combined() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .write(Relation::Categories, &[named("A"), named("B")])
            .unwrap();
        storage
            .write(Relation::Items, &[Row::new().with(Column::Name, "x")])
            .unwrap();
        storage
            .write(
                Relation::CategoryItems,
                &[
                    Row::new().with(Column::CategoryId, 1).with(Column::ItemId, 1),
                    Row::new().with(Column::CategoryId, 2).with(Column::ItemId, 1),
                ],
            )
            .unwrap();

        let rows = storage
            .get(
                Relation::CategoryItems,
                &Filter::eq(Column::CategoryId, 2).and(Column::ItemId, 1),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int(Column::Id), Some(2));
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let hostile = "x'); DROP TABLE categories; --";
        storage
            .write(Relation::Categories, &[named(hostile)])
            .unwrap();

        let rows = storage
            .get(Relation::Categories, &Filter::eq(Column::Name, hostile))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(Column::Name), Some(hostile));
    }

    #[test]
    fn test_write_rejects_mixed_column_sets() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result = storage.write(
            Relation::CategoryItems,
            &[
                Row::new().with(Column::CategoryId, 1).with(Column::ItemId, 1),
                Row::new().with(Column::CategoryId, 1),
            ],
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result = storage.write(
            Relation::Categories,
            &[Row::new().with(Column::ItemId, 1)],
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = storage.get(Relation::Items, &Filter::eq(Column::CategoryId, 1));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(storage.write(Relation::Items, &[]).unwrap(), 0);
    }

    #[test]
    fn test_delete_requires_filter() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .write(Relation::Categories, &[named("Drinks")])
            .unwrap();

        let result = storage.delete(Relation::Categories, &Filter::all());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(storage.catalog_counts().unwrap().categories, 1);

        let deleted = storage
            .delete(Relation::Categories, &Filter::eq(Column::Id, 1))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(storage.catalog_counts().unwrap().categories, 0);
    }

    #[test]
    fn test_unique_name_violation_is_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.write(Relation::Items, &[named("Cola")]).unwrap();
        let dup = storage.write(Relation::Items, &[named("Cola")]);
        assert!(matches!(dup, Err(Error::Database(_))));
    }

    #[test]
    fn test_list_catalog_groups_items() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .write(Relation::Categories, &[named("Snacks"), named("Drinks")])
            .unwrap();
        storage
            .write(Relation::Items, &[named("Chips"), named("Cola")])
            .unwrap();
        storage
            .write(
                Relation::CategoryItems,
                &[
                    Row::new().with(Column::CategoryId, 1).with(Column::ItemId, 1),
                    Row::new().with(Column::CategoryId, 1).with(Column::ItemId, 2),
                ],
            )
            .unwrap();

        let listing = storage.list_catalog().unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "Drinks");
        assert!(listing[0].items.is_empty());
        assert_eq!(listing[1].name, "Snacks");
        assert_eq!(listing[1].items, vec!["Chips", "Cola"]);
    }

    #[test]
    fn test_open_missing_directory_is_unavailable() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("no").join("such").join("catalog.db");
        let result = SqliteStorage::open(&path);
        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    }
}
