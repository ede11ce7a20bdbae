use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Environment variable that relocates the launcher root.
pub const HOME_OVERRIDE_ENV: &str = "VITA_LAUNCHER_HOME";

const RUNELITE_DIR_NAME: &str = ".runelite";
const APP_DIR_NAME: &str = "vitalite";
const JDK_DIR_NAME: &str = "jdk";
const TEMP_DIR_NAME: &str = "temp";
const VERSION_FILE: &str = "version.txt";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// File name of the client artifact, both inside release archives and on disk.
pub const ARTIFACT_FILE: &str = "VitaLite.jar";

/// Fixed on-disk layout under the per-user launcher root.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    root: PathBuf,
}

impl LauncherPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the launcher root (`VITA_LAUNCHER_HOME`, else `~/.runelite/vitalite`)
    /// and make sure it exists.
    pub fn resolve() -> LauncherResult<Self> {
        let root = match std::env::var_os(HOME_OVERRIDE_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => dirs::home_dir()
                .ok_or_else(|| LauncherError::Other("Cannot determine the home directory".into()))?
                .join(RUNELITE_DIR_NAME)
                .join(APP_DIR_NAME),
        };

        Ok(Self::new(canonical_or_create_dir(&root)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runtime install root.
    pub fn jdk_dir(&self) -> PathBuf {
        self.root.join(JDK_DIR_NAME)
    }

    /// Staging directory the runtime archive is unpacked into.
    pub fn jdk_staging_dir(&self) -> PathBuf {
        self.jdk_dir().join(TEMP_DIR_NAME)
    }

    /// Scratch space for release downloads.
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR_NAME)
    }

    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(ARTIFACT_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }
}

fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}
