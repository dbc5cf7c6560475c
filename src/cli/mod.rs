//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// catalog-sync - Reconcile a category/item snapshot into a SQLite catalog
#[derive(Parser, Debug)]
#[command(name = "catalog-sync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.catalog-sync/data/catalog.db)
    #[arg(long, global = true, env = "CATALOG_SYNC_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no logging, errors only as exit codes)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the catalog database
    Init {
        /// Delete and recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Fetch the snapshot and reconcile the catalog with it
    Import(ImportArgs),

    /// Reconcile the catalog with a snapshot file on disk
    Reconcile {
        /// Path to the snapshot JSON file
        path: PathBuf,

        /// Name comparison: exact, trimmed, case-insensitive
        #[arg(long, env = "CATALOG_SYNC_MATCH")]
        match_policy: Option<String>,
    },

    /// Show catalog counts and recent runs
    Status {
        /// Number of recent runs to show
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// List categories with their items
    Catalog,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Snapshot location: an http(s) base URL or a local directory
    #[arg(long, env = "CATALOG_SYNC_SOURCE")]
    pub source: Option<String>,

    /// Snapshot file name (default: Menu.json)
    #[arg(long, env = "CATALOG_SYNC_FILE")]
    pub file: Option<String>,

    /// Directory the snapshot is downloaded into
    #[arg(long, env = "CATALOG_SYNC_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Name comparison: exact, trimmed, case-insensitive
    #[arg(long, env = "CATALOG_SYNC_MATCH")]
    pub match_policy: Option<String>,

    /// Use the file already in the work directory instead of fetching
    #[arg(long)]
    pub skip_fetch: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
