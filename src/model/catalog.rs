//! Catalog entities.
//!
//! Two views of the same data: records as they appear in a snapshot file
//! (no ids), and rows as they exist in the store (with surrogate ids).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{Column, Relation, Row};

/// A category as listed in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
}

impl CategoryRecord {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Insert payload for `categories`.
    #[must_use]
    pub fn insert_row(&self) -> Row {
        Row::new().with(Column::Name, self.name.as_str())
    }
}

/// An item as listed in a snapshot, with the category it is offered under.
///
/// The same item name may appear several times under different categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(rename = "category")]
    pub category_name: String,
}

impl ItemRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category_name: category_name.into(),
        }
    }

    /// Insert payload for `items`. Only the name is stored; placement is a
    /// separate `category_items` row.
    #[must_use]
    pub fn insert_row(&self) -> Row {
        Row::new().with(Column::Name, self.name.as_str())
    }
}

/// A persisted category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

/// A persisted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
}

/// A persisted category/item association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryItemRow {
    pub id: i64,
    pub category_id: i64,
    pub item_id: i64,
}

impl CategoryItemRow {
    /// Insert payload for a new `(category_id, item_id)` pair.
    #[must_use]
    pub fn insert_row(category_id: i64, item_id: i64) -> Row {
        Row::new()
            .with(Column::CategoryId, category_id)
            .with(Column::ItemId, item_id)
    }
}

fn missing(relation: Relation, column: Column) -> Error {
    Error::Other(format!(
        "row from '{relation}' is missing column '{column}'"
    ))
}

fn require_int(row: &Row, relation: Relation, column: Column) -> Result<i64> {
    row.int(column).ok_or_else(|| missing(relation, column))
}

fn require_text(row: &Row, relation: Relation, column: Column) -> Result<String> {
    row.text(column)
        .map(str::to_string)
        .ok_or_else(|| missing(relation, column))
}

impl TryFrom<&Row> for CategoryRow {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: require_int(row, Relation::Categories, Column::Id)?,
            name: require_text(row, Relation::Categories, Column::Name)?,
        })
    }
}

impl TryFrom<&Row> for ItemRow {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: require_int(row, Relation::Items, Column::Id)?,
            name: require_text(row, Relation::Items, Column::Name)?,
        })
    }
}

impl TryFrom<&Row> for CategoryItemRow {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: require_int(row, Relation::CategoryItems, Column::Id)?,
            category_id: require_int(row, Relation::CategoryItems, Column::CategoryId)?,
            item_id: require_int(row, Relation::CategoryItems, Column::ItemId)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_record_reads_category_key() {
        let item: ItemRecord =
            serde_json::from_str(r#"{"name": "Cola", "category": "Drinks"}"#).unwrap();
        assert_eq!(item, ItemRecord::new("Cola", "Drinks"));
    }

    #[test]
    fn test_item_insert_row_has_name_only() {
        let row = ItemRecord::new("Cola", "Drinks").insert_row();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec![Column::Name]);
        assert_eq!(row.text(Column::Name), Some("Cola"));
    }

    #[test]
    fn test_row_conversion() {
        let row = Row::new()
            .with(Column::Id, 100)
            .with(Column::CategoryId, 1)
            .with(Column::ItemId, 10);
        let ci = CategoryItemRow::try_from(&row).unwrap();
        assert_eq!(
            ci,
            CategoryItemRow {
                id: 100,
                category_id: 1,
                item_id: 10
            }
        );

        assert!(CategoryRow::try_from(&row).is_err());
    }
}
