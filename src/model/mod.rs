//! Data models for catalog-sync.
//!
//! - Snapshot records: `CategoryRecord`, `ItemRecord`
//! - Store rows: `CategoryRow`, `ItemRow`, `CategoryItemRow`

pub mod catalog;

pub use catalog::{CategoryItemRow, CategoryRecord, CategoryRow, ItemRecord, ItemRow};
