//! catalog-sync: reconcile a category/item snapshot into a SQLite catalog.
//!
//! # Architecture
//!
//! - [`snapshot`] - Snapshot file reader
//! - [`storage`] - SQLite store behind the `StoreAccessor` trait
//! - [`reconcile`] - The reconciliation engine
//! - [`transfer`] - Fetching snapshots from HTTP or a local directory
//! - [`runner`] - One import run, end to end
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Configuration management
//! - [`model`] - Snapshot records and store rows
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod runner;
pub mod snapshot;
pub mod storage;
pub mod transfer;

pub use error::{Error, Result};
