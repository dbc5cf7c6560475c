//! Generic relation access used by the reconciliation engine.
//!
//! The engine never writes SQL. It reads and writes [`Row`]s against a
//! closed set of [`Relation`]s and [`Column`]s, and any backend that can
//! do equality-filtered select/insert/delete implements [`StoreAccessor`].
//!
//! Table and column identifiers come only from the enums below; every value
//! is bound as a statement parameter.

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::error::Result;

/// A catalog relation the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Categories,
    Items,
    CategoryItems,
}

impl Relation {
    /// Table name in the store.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Items => "items",
            Self::CategoryItems => "category_items",
        }
    }

    /// Columns of this relation, in select order.
    #[must_use]
    pub const fn columns(&self) -> &'static [Column] {
        match self {
            Self::Categories | Self::Items => &[Column::Id, Column::Name],
            Self::CategoryItems => &[Column::Id, Column::CategoryId, Column::ItemId],
        }
    }

    /// Whether `column` belongs to this relation.
    #[must_use]
    pub fn has_column(&self, column: Column) -> bool {
        self.columns().contains(&column)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A column of a catalog relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Id,
    Name,
    CategoryId,
    ItemId,
}

impl Column {
    /// Column name in the store.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CategoryId => "category_id",
            Self::ItemId => "item_id",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::from(rusqlite::types::Null),
            Self::Integer(i) => ToSqlOutput::from(*i),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(i) => Ok(Self::Integer(i)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Self::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Real(_) | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// One row: a mapping from column to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(BTreeMap<Column, Value>);

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.0.insert(column, value.into());
        self
    }

    pub fn set(&mut self, column: Column, value: impl Into<Value>) {
        self.0.insert(column, value.into());
    }

    #[must_use]
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.0.get(&column)
    }

    #[must_use]
    pub fn int(&self, column: Column) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn text(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Columns present in this row, in stable order.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.keys().copied()
    }

    /// Values in the same order as [`Row::columns`].
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.0.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// AND-combined equality conditions.
///
/// An empty filter selects every row for `get` and is refused by `delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(Vec<(Column, Value)>);

impl Filter {
    /// Matches every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A single `column = value` condition.
    #[must_use]
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Self(vec![(column, value.into())])
    }

    /// Add another `column = value` condition.
    #[must_use]
    pub fn and(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.0.push((column, value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &(Column, Value)> + '_ {
        self.0.iter()
    }
}

/// Equality-filtered access to the catalog relations.
///
/// Each call commits on its own; there is no multi-call transaction.
pub trait StoreAccessor {
    /// Rows of `relation` matching `filter`, ordered by `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the filter names a column the
    /// relation does not have.
    fn get(&self, relation: Relation, filter: &Filter) -> Result<Vec<Row>>;

    /// Insert `rows` into `relation`. All rows must share the first row's
    /// column set. Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns an error on mismatched column sets, unknown columns, or
    /// constraint violations.
    fn write(&mut self, relation: Relation, rows: &[Row]) -> Result<usize>;

    /// Delete rows of `relation` matching `filter`. Returns the number of
    /// rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if `filter` is empty or the delete fails.
    fn delete(&mut self, relation: Relation, filter: &Filter) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_columns_are_ordered() {
        let row = Row::new()
            .with(Column::ItemId, 10)
            .with(Column::CategoryId, 1);
        let cols: Vec<Column> = row.columns().collect();
        assert_eq!(cols, vec![Column::CategoryId, Column::ItemId]);
        assert_eq!(row.int(Column::ItemId), Some(10));
        assert_eq!(row.text(Column::ItemId), None);
    }

    #[test]
    fn test_relation_columns() {
        assert!(Relation::Categories.has_column(Column::Name));
        assert!(!Relation::Categories.has_column(Column::ItemId));
        assert!(Relation::CategoryItems.has_column(Column::ItemId));
        assert_eq!(Relation::CategoryItems.to_string(), "category_items");
    }

    #[test]
    fn test_filter_builder() {
        assert!(Filter::all().is_empty());
        let filter = Filter::eq(Column::CategoryId, 1).and(Column::ItemId, 2);
        assert_eq!(filter.conditions().count(), 2);
    }
}
