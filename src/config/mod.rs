//! Configuration management.
//!
//! Every setting resolves in the same order:
//!
//! 1. CLI flag (clap also fills flags from their `CATALOG_SYNC_*` variable)
//! 2. Config file at `~/.catalog-sync/config.json`
//! 3. Built-in default
//!
//! The database and download directory live under `~/.catalog-sync/` unless
//! overridden.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::reconcile::MatchPolicy;
use crate::transfer::Credentials;

/// Snapshot file name used when none is configured.
pub const DEFAULT_FILE_NAME: &str = "Menu.json";

/// Environment variable holding the HTTP basic-auth user.
pub const USER_ENV: &str = "CATALOG_SYNC_USER";

/// Environment variable holding the HTTP basic-auth password.
pub const PASSWORD_ENV: &str = "CATALOG_SYNC_PASSWORD";

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_policy: Option<MatchPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Get the global catalog-sync directory (`~/.catalog-sync/`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".catalog-sync"))
}

/// Path of the config file.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.json"))
}

/// Load settings from the default config file.
///
/// A missing file (or no home directory) yields default settings.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Settings> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Settings::default()),
    }
}

/// Load settings from `path`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))
}

/// Write `settings` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the database path.
///
/// Priority:
/// 1. `explicit_path` (from `--db` or `CATALOG_SYNC_DB`)
/// 2. `db` in the config file
/// 3. `~/.catalog-sync/data/catalog.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>, settings: &Settings) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = &settings.db {
        return Some(path.clone());
    }
    global_dir().map(|dir| dir.join("data").join("catalog.db"))
}

/// Resolve the snapshot source location. `None` if nothing is configured.
#[must_use]
pub fn resolve_source(explicit: Option<&str>, settings: &Settings) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| settings.source.clone())
        .filter(|s| !s.trim().is_empty())
}

/// Resolve the snapshot file name, defaulting to [`DEFAULT_FILE_NAME`].
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the name is empty or contains a
/// path separator.
pub fn resolve_file_name(explicit: Option<&str>, settings: &Settings) -> Result<String> {
    let name = explicit
        .map(str::to_string)
        .or_else(|| settings.file.clone())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidArgument(format!(
            "snapshot file name must be a plain file name, got '{name}'"
        )));
    }
    Ok(name)
}

/// Resolve the local working directory downloads land in.
///
/// # Errors
///
/// Returns [`Error::Config`] if no home directory can be found and nothing
/// is configured.
pub fn resolve_work_dir(explicit: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| settings.work_dir.clone())
        .or_else(|| global_dir().map(|dir| dir.join("downloads")))
        .ok_or_else(|| Error::Config("could not determine a work directory".to_string()))
}

/// Resolve the name match policy.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an unknown policy name.
pub fn resolve_match_policy(explicit: Option<&str>, settings: &Settings) -> Result<MatchPolicy> {
    match explicit {
        Some(s) => s.parse(),
        None => Ok(settings.match_policy.unwrap_or_default()),
    }
}

/// Resolve HTTP basic-auth credentials.
///
/// The user comes from `CATALOG_SYNC_USER` or the config file; the password
/// only ever comes from `CATALOG_SYNC_PASSWORD`.
#[must_use]
pub fn resolve_credentials(settings: &Settings) -> Option<Credentials> {
    credentials_from(
        std::env::var(USER_ENV).ok(),
        std::env::var(PASSWORD_ENV).ok(),
        settings,
    )
}

fn credentials_from(
    env_user: Option<String>,
    env_password: Option<String>,
    settings: &Settings,
) -> Option<Credentials> {
    let user = env_user
        .filter(|u| !u.is_empty())
        .or_else(|| settings.user.clone())?;
    Some(Credentials {
        user,
        password: env_password.filter(|p| !p.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_db_path_priority() {
        let explicit = PathBuf::from("/custom/catalog.db");
        let settings = Settings {
            db: Some(PathBuf::from("/from/config.db")),
            ..Settings::default()
        };

        assert_eq!(
            resolve_db_path(Some(explicit.as_path()), &settings),
            Some(explicit.clone())
        );
        assert_eq!(
            resolve_db_path(None, &settings),
            Some(PathBuf::from("/from/config.db"))
        );

        let default = resolve_db_path(None, &Settings::default()).unwrap();
        assert!(default.ends_with("data/catalog.db"));
    }

    #[test]
    fn test_file_name_defaults_and_validation() {
        let settings = Settings::default();
        assert_eq!(resolve_file_name(None, &settings).unwrap(), "Menu.json");
        assert_eq!(
            resolve_file_name(Some("Lunch.json"), &settings).unwrap(),
            "Lunch.json"
        );
        assert!(resolve_file_name(Some("../etc/passwd"), &settings).is_err());
        assert!(resolve_file_name(Some(" "), &settings).is_err());
    }

    #[test]
    fn test_match_policy_from_config() {
        let settings = Settings {
            match_policy: Some(MatchPolicy::Trimmed),
            ..Settings::default()
        };
        assert_eq!(
            resolve_match_policy(None, &settings).unwrap(),
            MatchPolicy::Trimmed
        );
        assert_eq!(
            resolve_match_policy(Some("exact"), &settings).unwrap(),
            MatchPolicy::Exact
        );
        assert!(resolve_match_policy(Some("fuzzy"), &settings).is_err());
    }

    #[test]
    fn test_source_ignores_blank() {
        let settings = Settings {
            source: Some("https://menus.example.com".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            resolve_source(None, &settings).as_deref(),
            Some("https://menus.example.com")
        );
        assert_eq!(resolve_source(Some("  "), &Settings::default()), None);
    }

    #[test]
    fn test_credentials() {
        let settings = Settings {
            user: Some("menu".to_string()),
            ..Settings::default()
        };
        let creds = credentials_from(None, Some("s3cret".into()), &settings).unwrap();
        assert_eq!(creds.user, "menu");
        assert_eq!(creds.password.as_deref(), Some("s3cret"));

        let creds = credentials_from(Some("env-user".into()), None, &settings).unwrap();
        assert_eq!(creds.user, "env-user");
        assert_eq!(creds.password, None);

        assert!(credentials_from(None, Some("x".into()), &Settings::default()).is_none());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        assert_eq!(load_config_from(&path).unwrap(), Settings::default());

        let settings = Settings {
            source: Some("/srv/menus".to_string()),
            match_policy: Some(MatchPolicy::CaseInsensitive),
            ..Settings::default()
        };
        save_config_to(&path, &settings).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"matchPolicy\": \"case-insensitive\""));
        assert_eq!(load_config_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 7);
    }
}
