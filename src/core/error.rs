use std::path::{Path, PathBuf};
use thiserror::Error;

/// Central error type for the launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Insufficient disk space at {path:?}: available={available} required={required}")]
    InsufficientDiskSpace {
        path: PathBuf,
        available: u64,
        required: u64,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    // ── Metadata ────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsafe archive entry: {0}")]
    UnsafeArchiveEntry(String),

    #[error("{artifact} not found in archive {archive:?}")]
    ArtifactMissing { artifact: String, archive: PathBuf },

    // ── Runtime ─────────────────────────────────────────
    #[error("JDK installation failed - Java executable not found after extraction: {0:?}")]
    RuntimeMissing(PathBuf),

    // ── Launch ──────────────────────────────────────────
    #[error("VitaLite JAR file not found: {0:?}")]
    ArtifactNotInstalled(PathBuf),

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    #[error("VitaLite exited ({0}) before signalling that it started")]
    ClientExited(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

/// Builds a `map_err` adapter that attaches `path` to an IO error.
pub(crate) fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> LauncherError {
    let path = path.to_path_buf();
    move |source| LauncherError::Io { path, source }
}
