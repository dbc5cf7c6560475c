//! SQLite storage layer for catalog-sync.
//!
//! # Submodules
//!
//! - [`accessor`] - Relation/column/row types and the `StoreAccessor` trait
//! - [`runs`] - Import run history
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - SQLite implementation of the accessor

pub mod accessor;
pub mod runs;
pub mod schema;
pub mod sqlite;

pub use accessor::{Column, Filter, Relation, Row, StoreAccessor, Value};
pub use runs::{RunRecord, RunStatus};
pub use sqlite::{CatalogCounts, CategoryListing, SqliteStorage};
