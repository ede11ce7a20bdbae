// ─── Update Processor ───
// Applies the decision of `UpdateState`: nothing, install the latest fork
// release, or report that a compatible build has not been published yet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::error::{io_at, LauncherError, LauncherResult};
use crate::core::progress::{ProgressReporter, StageProgress, UPDATE_DOWNLOAD};
use crate::core::state::{LauncherPaths, ARTIFACT_FILE};
use crate::core::version::{
    write_version_marker, ReleaseFeed, UpdateState, VersionCheck, VersionResolver,
};

pub struct UpdateProcessor {
    paths: LauncherPaths,
    feed: Arc<dyn ReleaseFeed>,
    resolver: VersionResolver,
}

impl UpdateProcessor {
    pub fn new(paths: LauncherPaths, feed: Arc<dyn ReleaseFeed>) -> Self {
        let resolver = VersionResolver::new(paths.version_file(), feed.clone());
        Self {
            paths,
            feed,
            resolver,
        }
    }

    /// Bring the installed client up to date. `Ok(false)` means an update is
    /// required but no compatible build exists yet, so the client must not be
    /// launched.
    #[instrument(skip(self, progress))]
    pub async fn apply(&self, progress: &ProgressReporter) -> LauncherResult<bool> {
        let check = self.resolver.check().await?;

        match check.state() {
            UpdateState::NoUpdate => {
                info!("VitaLite {} is up to date", check.local);
                progress.report_new_stage(100, UPDATE_DOWNLOAD.end(), "VitaLite is up to date");
                Ok(true)
            }
            UpdateState::UpdateWaiting => {
                info!(
                    "Waiting for a VitaLite build on upstream line {}",
                    check.upstream
                );
                progress.report_new_stage(
                    0,
                    UPDATE_DOWNLOAD.start(),
                    "Waiting for a compatible VitaLite release...",
                );
                self.install_fallback_build(&check, progress).await;
                Ok(false)
            }
            UpdateState::UpdateAvailable => {
                self.install_release(&check.fork, progress).await?;
                Ok(true)
            }
        }
    }

    /// Installs the newest fork build even though it does not match the
    /// upstream line. Failures are logged and otherwise ignored.
    async fn install_fallback_build(&self, check: &VersionCheck, progress: &ProgressReporter) {
        if check.fork == check.local {
            return;
        }

        info!(
            "Installing fork build {} as a fallback while waiting",
            check.fork
        );
        if let Err(err) = self.install_release(&check.fork, progress).await {
            warn!("Fallback install of {} failed: {}", check.fork, err);
        }
    }

    /// Download release `tag`, swap in its artifact and record `tag` as installed.
    pub async fn install_release(&self, tag: &str, progress: &ProgressReporter) -> LauncherResult<()> {
        let stage = progress.stage(UPDATE_DOWNLOAD);
        stage.update(0, &format!("Downloading VitaLite {tag}..."));

        let temp_dir = self.paths.temp_dir();
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(io_at(&temp_dir))?;
        let archive = temp_dir.join(format!("vitalite-{}.zip", Uuid::new_v4()));

        let result = self.download_and_install(tag, &archive, &stage).await;

        if let Err(err) = tokio::fs::remove_file(&archive).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove {:?}: {}", archive, err);
            }
        }
        result
    }

    async fn download_and_install(
        &self,
        tag: &str,
        archive: &Path,
        stage: &StageProgress,
    ) -> LauncherResult<()> {
        self.feed.download_release(tag, archive, stage).await?;

        let source = archive.to_path_buf();
        let dest = self.paths.artifact_path();
        tokio::task::spawn_blocking(move || extract_artifact(&source, &dest))
            .await
            .map_err(|err| LauncherError::Other(format!("Artifact extraction task failed: {err}")))??;

        write_version_marker(&self.paths.version_file(), tag)?;
        stage.finish(&format!("VitaLite {tag} installed"));
        info!("Installed VitaLite {}", tag);
        Ok(())
    }
}

/// Copy the artifact entry of `archive` over `dest`.
///
/// The entry named exactly [`ARTIFACT_FILE`] wins; otherwise the first entry
/// whose name ends with it. The copy goes to a sibling `.part` file first, so
/// `dest` is only replaced by a complete artifact.
pub fn extract_artifact(archive: &Path, dest: &Path) -> LauncherResult<()> {
    let file = fs::File::open(archive).map_err(io_at(archive))?;
    let mut zip = zip::ZipArchive::new(file)?;

    let index = zip.index_for_name(ARTIFACT_FILE).or_else(|| {
        let name = zip
            .file_names()
            .find(|name| name.ends_with(ARTIFACT_FILE))?
            .to_string();
        zip.index_for_name(&name)
    });
    let Some(index) = index else {
        return Err(LauncherError::ArtifactMissing {
            artifact: ARTIFACT_FILE.to_string(),
            archive: archive.to_path_buf(),
        });
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    let part = part_path(dest);
    {
        let mut entry = zip.by_index(index)?;
        let mut out = fs::File::create(&part).map_err(io_at(&part))?;
        io::copy(&mut entry, &mut out).map_err(io_at(&part))?;
    }
    fs::rename(&part, dest).map_err(io_at(dest))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
