use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{io_at, LauncherError, LauncherResult};
use crate::core::platform::HostPlatform;
use crate::core::progress::{ProgressReporter, RUNTIME_DOWNLOAD, RUNTIME_EXTRACT};
use crate::core::state::LauncherPaths;

use super::extract::{extract_archive, move_from_nested_folder};

/// The one runtime build the client is pinned to.
pub const JDK_VERSION: &str = "11.0.19+7";

const ADOPTIUM_BINARY_BASE: &str = "https://api.adoptium.net/v3/binary/version";
const RUNTIME_RECORD_FILE: &str = "runtime.json";
const ARCHIVE_STEM: &str = "jdk-temp";
const MIN_FREE_DISK_BYTES: u64 = 512 * 1024 * 1024;

/// A provisioned runtime. Only handed out once `java_bin` exists and is executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInstall {
    pub root: PathBuf,
    pub java_bin: PathBuf,
}

/// Informational record written next to a freshly installed runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub version: String,
    pub os: String,
    pub arch: String,
    pub source_url: String,
    pub installed_at: String,
}

/// Binary download URL for `version` on `host`; `+` in the version is
/// percent-encoded.
pub fn runtime_download_url(version: &str, host: HostPlatform) -> String {
    runtime_download_url_under(ADOPTIUM_BINARY_BASE, version, host)
}

fn runtime_download_url_under(base: &str, version: &str, host: HostPlatform) -> String {
    format!(
        "{}/jdk-{}/{}/{}/jdk/hotspot/normal/eclipse",
        base.trim_end_matches('/'),
        version.replace('+', "%2B"),
        host.os.distribution_os(),
        host.arch.distribution_arch()
    )
}

/// Makes sure the pinned runtime is installed under the launcher root.
pub struct RuntimeProvisioner {
    paths: LauncherPaths,
    host: HostPlatform,
    downloader: Downloader,
    download_base: String,
}

impl RuntimeProvisioner {
    pub fn new(paths: LauncherPaths, host: HostPlatform, downloader: Downloader) -> Self {
        Self {
            paths,
            host,
            downloader,
            download_base: ADOPTIUM_BINARY_BASE.to_string(),
        }
    }

    /// Fetch runtime binaries from `base` instead of the Adoptium API.
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        self.download_base = base.into();
        self
    }

    pub fn install_root(&self) -> PathBuf {
        self.paths.jdk_dir()
    }

    pub fn java_executable(&self) -> PathBuf {
        self.host.os.java_executable(&self.install_root())
    }

    /// Return the installed runtime, downloading and unpacking it first when
    /// the executable is absent.
    #[instrument(skip(self, progress), fields(host = %self.host))]
    pub async fn ensure_runtime(&self, progress: &ProgressReporter) -> LauncherResult<RuntimeInstall> {
        let root = self.install_root();
        let java_bin = self.java_executable();

        if is_usable_executable(&java_bin) {
            debug!("Runtime already present at {:?}", java_bin);
            progress.report_new_stage(100, RUNTIME_EXTRACT.end(), "JDK 11 ready");
            return Ok(RuntimeInstall { root, java_bin });
        }

        info!("JDK {} not found, downloading...", JDK_VERSION);
        tokio::fs::create_dir_all(&root).await.map_err(io_at(&root))?;
        ensure_min_disk_space(&root, MIN_FREE_DISK_BYTES)?;

        let url = runtime_download_url_under(&self.download_base, JDK_VERSION, self.host);
        let format = self.host.os.archive_format();
        let archive = root.join(format!("{}{}", ARCHIVE_STEM, format.extension()));

        let download = progress.stage(RUNTIME_DOWNLOAD);
        download.update(0, "Downloading JDK 11...");
        self.downloader
            .download_to_file(&url, &archive, &download, "Downloading JDK 11")
            .await?;
        download.finish("Download complete!");

        let extract = progress.stage(RUNTIME_EXTRACT);
        extract.update(0, "Extracting JDK 11...");
        let staging = self.paths.jdk_staging_dir();
        {
            let archive = archive.clone();
            let staging = staging.clone();
            let extract = extract.clone();
            tokio::task::spawn_blocking(move || {
                extract_archive(format, &archive, &staging, &extract, "Extracting JDK 11")
            })
            .await
            .map_err(|err| LauncherError::Other(format!("Extraction task failed: {err}")))??;
        }

        extract.update(99, "Finalizing installation...");
        {
            let staging = staging.clone();
            let root = root.clone();
            tokio::task::spawn_blocking(move || move_from_nested_folder(&staging, &root))
                .await
                .map_err(|err| LauncherError::Other(format!("Finalize task failed: {err}")))??;
        }
        tokio::fs::remove_file(&archive)
            .await
            .map_err(io_at(&archive))?;

        mark_executable(&java_bin)?;
        if !is_usable_executable(&java_bin) {
            return Err(LauncherError::RuntimeMissing(java_bin));
        }

        let record = RuntimeRecord {
            version: JDK_VERSION.to_string(),
            os: self.host.os.distribution_os().to_string(),
            arch: self.host.arch.distribution_arch().to_string(),
            source_url: url,
            installed_at: Utc::now().to_rfc3339(),
        };
        if let Err(err) = write_runtime_record(&root, &record).await {
            warn!("Could not write runtime record: {}", err);
        }

        extract.finish("JDK 11 installed successfully!");
        info!("JDK installed at {:?}", root);
        Ok(RuntimeInstall { root, java_bin })
    }
}

async fn write_runtime_record(root: &Path, record: &RuntimeRecord) -> LauncherResult<()> {
    let path = root.join(RUNTIME_RECORD_FILE);
    let raw = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(&path, raw).await.map_err(io_at(&path))
}

pub fn is_usable_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn mark_executable(java_bin: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if java_bin.exists() {
            std::fs::set_permissions(java_bin, std::fs::Permissions::from_mode(0o755))
                .map_err(io_at(java_bin))?;
        }
    }
    #[cfg(not(unix))]
    let _ = java_bin;
    Ok(())
}

fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> LauncherResult<()> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }

    match available {
        Some(bytes) if bytes < minimum_bytes => Err(LauncherError::InsufficientDiskSpace {
            path: path.to_path_buf(),
            available: bytes,
            required: minimum_bytes,
        }),
        _ => Ok(()),
    }
}
