//! Snapshot transfer.
//!
//! A [`SnapshotSource`] places the raw snapshot file in a local working
//! directory before the reader parses it. Two sources exist:
//!
//! - [`LocalSource`] copies from a directory on disk
//! - [`HttpSource`] downloads with `reqwest`, optionally with basic auth
//!
//! Every failure maps to [`Error::Transfer`], which is fatal to a run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Request timeout for HTTP downloads.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can deliver a snapshot file into a local directory.
pub trait SnapshotSource {
    /// Fetch `file_name` into `dest_dir`, returning the local path.
    ///
    /// On success the file exists at `dest_dir/file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transfer`] if the file cannot be obtained or written.
    fn fetch(&self, file_name: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

fn transfer_error(file_name: &str, message: impl Into<String>) -> Error {
    Error::Transfer {
        file: file_name.to_string(),
        message: message.into(),
    }
}

fn prepare_dest(file_name: &str, dest_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dest_dir).map_err(|e| {
        transfer_error(
            file_name,
            format!("cannot create {}: {e}", dest_dir.display()),
        )
    })?;
    Ok(dest_dir.join(file_name))
}

/// Copies snapshots from a local directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    pub dir: PathBuf,
}

impl LocalSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SnapshotSource for LocalSource {
    fn fetch(&self, file_name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let src = self.dir.join(file_name);
        let dest = prepare_dest(file_name, dest_dir)?;

        if src == dest {
            debug!(path = %src.display(), "Source and destination are the same file");
            return if src.is_file() {
                Ok(dest)
            } else {
                Err(transfer_error(file_name, format!("{} not found", src.display())))
            };
        }

        let bytes = std::fs::copy(&src, &dest)
            .map_err(|e| transfer_error(file_name, format!("copy from {}: {e}", src.display())))?;
        info!(from = %src.display(), to = %dest.display(), bytes, "Copied snapshot");
        Ok(dest)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Basic-auth credentials for [`HttpSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

/// Downloads snapshots over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    pub base_url: String,
    pub credentials: Option<Credentials>,
}

impl HttpSource {
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
        }
    }

    /// URL the file is requested from.
    #[must_use]
    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }

    async fn download(&self, file_name: &str) -> Result<Vec<u8>> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| transfer_error(file_name, format!("HTTP client: {e}")))?;

        let url = self.url_for(file_name);
        let mut request = client.get(&url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.user, creds.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transfer_error(file_name, format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transfer_error(file_name, format!("GET {url} returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transfer_error(file_name, format!("reading body: {e}")))?;
        Ok(body.to_vec())
    }
}

impl SnapshotSource for HttpSource {
    fn fetch(&self, file_name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let dest = prepare_dest(file_name, dest_dir)?;

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| transfer_error(file_name, format!("failed to create runtime: {e}")))?;
        let bytes = rt.block_on(self.download(file_name))?;

        std::fs::write(&dest, &bytes)
            .map_err(|e| transfer_error(file_name, format!("write {}: {e}", dest.display())))?;
        info!(url = %self.url_for(file_name), to = %dest.display(), bytes = bytes.len(), "Downloaded snapshot");
        Ok(dest)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Pick a source for `location`: HTTP for `http://`/`https://` URLs, a local
/// directory otherwise.
#[must_use]
pub fn source_for(location: &str, credentials: Option<Credentials>) -> Box<dyn SnapshotSource> {
    if is_remote(location) {
        Box::new(HttpSource::new(location, credentials))
    } else {
        Box::new(LocalSource::new(location))
    }
}

/// Whether `location` is an HTTP(S) URL.
#[must_use]
pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_source_copies_file() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        std::fs::write(src.path().join("Menu.json"), b"{}").unwrap();

        let source = LocalSource::new(src.path());
        let path = source.fetch("Menu.json", &work.path().join("downloads")).unwrap();
        assert_eq!(path, work.path().join("downloads").join("Menu.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_local_source_missing_file_is_transfer_error() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();

        let err = LocalSource::new(src.path())
            .fetch("Menu.json", work.path())
            .unwrap_err();
        assert!(matches!(err, Error::Transfer { ref file, .. } if file == "Menu.json"));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_local_source_same_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Menu.json"), b"{}").unwrap();

        let path = LocalSource::new(dir.path())
            .fetch("Menu.json", dir.path())
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"{}");
    }

    #[test]
    fn test_http_url_joins_base() {
        let source = HttpSource::new("https://menus.example.com/export/", None);
        assert_eq!(
            source.url_for("Menu.json"),
            "https://menus.example.com/export/Menu.json"
        );
    }

    #[test]
    fn test_http_unreachable_is_transfer_error() {
        let work = TempDir::new().unwrap();
        let source = HttpSource::new("http://127.0.0.1:9", None);
        let err = source.fetch("Menu.json", work.path()).unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
        assert!(err.error_code().is_retryable());
    }

    #[test]
    fn test_source_for_picks_by_scheme() {
        assert!(is_remote("HTTPS://host/menus"));
        assert!(is_remote("http://host"));
        assert!(!is_remote("/srv/menus"));
        assert!(!is_remote("ftp://host/menus"));
        assert_eq!(source_for("HTTPS://host/menus", None).describe(), "HTTPS://host/menus");
        assert_eq!(source_for("/srv/menus", None).describe(), "/srv/menus");
    }
}
