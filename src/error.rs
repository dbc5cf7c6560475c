//! Error types for catalog-sync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 4=input, 6=transfer, etc.)
//! - Retryability flags for schedulers that re-run failed imports
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Only run-level failures live here. Failures of a single record during
//! reconciliation are [`crate::reconcile::RecordError`] and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Store (exit 2)
    NotInitialized,
    AlreadyInitialized,
    StoreUnavailable,
    DatabaseError,

    // Input (exit 4)
    SnapshotError,
    InvalidArgument,

    // Transfer (exit 6)
    TransferError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SnapshotError => "SNAPSHOT_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::TransferError => "TRANSFER_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::StoreUnavailable
            | Self::DatabaseError => 2,
            Self::SnapshotError | Self::InvalidArgument => 4,
            Self::TransferError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same command later may succeed.
    ///
    /// True for transient conditions (network, locked or missing store).
    /// False for malformed input and configuration mistakes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransferError | Self::StoreUnavailable | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that abort a catalog-sync command.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `catalog-sync init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Store unavailable at {path}: {message}")]
    StoreUnavailable { path: PathBuf, message: String },

    #[error("Transfer of '{file}' failed: {message}")]
    Transfer { file: String, message: String },

    #[error("Unreadable snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            Self::Transfer { .. } => ErrorCode::TransferError,
            Self::Snapshot { .. } => ErrorCode::SnapshotError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `catalog-sync init` to create the database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use --force to recreate it.",
                path.display()
            )),

            Self::StoreUnavailable { path, .. } => Some(format!(
                "Check that {} exists and is not locked by another import.",
                path.display()
            )),

            Self::Transfer { file, .. } => Some(format!(
                "Verify --source (or CATALOG_SYNC_SOURCE) serves '{file}'. \
                 Use `--skip-fetch` to import a file already in the work directory."
            )),

            Self::Snapshot { .. } => Some(
                "Expected JSON like {\"category\": [{\"name\": ...}], \
                 \"item\": [{\"name\": ..., \"category\": ...}]}"
                    .to_string(),
            ),

            Self::InvalidArgument(msg) if msg.contains("match policy") => {
                Some("Valid match policies: exact, trimmed, case-insensitive".to_string())
            }

            Self::Config(_) => Some(
                "Check ~/.catalog-sync/config.json or the CATALOG_SYNC_* environment variables"
                    .to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
