use std::path::Path;

use tracing::debug;

use crate::core::error::{io_at, LauncherResult};

/// Version reported when nothing is installed yet.
pub const NO_VERSION: &str = "0.0.0";

/// Read the installed version. An absent, unreadable or blank marker reads as
/// [`NO_VERSION`].
pub fn read_local_version(marker: &Path) -> String {
    match std::fs::read_to_string(marker) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                NO_VERSION.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(err) => {
            debug!("No usable version marker at {:?}: {}", marker, err);
            NO_VERSION.to_string()
        }
    }
}

/// Persist `version` (trimmed) as the installed version.
pub fn write_version_marker(marker: &Path, version: &str) -> LauncherResult<()> {
    if let Some(parent) = marker.parent() {
        std::fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    std::fs::write(marker, version.trim()).map_err(io_at(marker))
}
