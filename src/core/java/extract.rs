// ─── Runtime Archive Extraction ───
// Streams zip / tar.gz entries into a staging directory, then lifts the
// archive's single top-level folder into the install root.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::core::error::{io_at, LauncherError, LauncherResult};
use crate::core::platform::ArchiveFormat;
use crate::core::progress::StageProgress;

/// Entry count assumed for tar archives, which cannot be counted without a
/// second decompression pass.
const ESTIMATED_TAR_ENTRIES: usize = 3000;

/// Minimum spacing between two extraction progress updates.
const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Unpack `archive` into `staging`, which is recreated empty first.
/// Returns the number of entries processed.
pub fn extract_archive(
    format: ArchiveFormat,
    archive: &Path,
    staging: &Path,
    stage: &StageProgress,
    label: &str,
) -> LauncherResult<usize> {
    info!("Extracting {:?} into {:?}", archive, staging);
    if staging.exists() {
        fs::remove_dir_all(staging).map_err(io_at(staging))?;
    }
    fs::create_dir_all(staging).map_err(io_at(staging))?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive, staging, stage, label),
        ArchiveFormat::TarGz => extract_tar_gz(archive, staging, stage, label),
    }
}

fn extract_zip(
    zip_path: &Path,
    staging: &Path,
    stage: &StageProgress,
    label: &str,
) -> LauncherResult<usize> {
    let zip_file = fs::File::open(zip_path).map_err(io_at(zip_path))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;
    let total = archive.len();
    debug!("Extracting {} files...", total);

    let mut ticker = ExtractTicker::new(stage, label, Some(total));
    for index in 0..total {
        let mut zipped = archive.by_index(index)?;
        let relative = zipped
            .enclosed_name()
            .ok_or_else(|| LauncherError::UnsafeArchiveEntry(zipped.name().to_string()))?;
        let out_path = staging.join(relative);

        if zipped.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_at(&out_path))?;
        } else {
            create_parent(&out_path)?;
            let mut out = fs::File::create(&out_path).map_err(io_at(&out_path))?;
            io::copy(&mut zipped, &mut out).map_err(io_at(&out_path))?;
        }

        ticker.tick();
    }

    Ok(ticker.count)
}

fn extract_tar_gz(
    tar_gz_path: &Path,
    staging: &Path,
    stage: &StageProgress,
    label: &str,
) -> LauncherResult<usize> {
    let file = fs::File::open(tar_gz_path).map_err(io_at(tar_gz_path))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut ticker = ExtractTicker::new(stage, label, None);

    for item in archive.entries().map_err(io_at(tar_gz_path))? {
        let mut entry = item.map_err(io_at(tar_gz_path))?;
        let raw_path = entry.path().map_err(io_at(tar_gz_path))?.into_owned();
        let relative = normalize_entry_path(&raw_path).ok_or_else(|| {
            LauncherError::UnsafeArchiveEntry(raw_path.to_string_lossy().to_string())
        })?;
        if relative.as_os_str().is_empty() {
            ticker.tick();
            continue;
        }
        let out_path = staging.join(relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_at(&out_path))?;
        } else if entry_type.is_symlink() {
            let target = entry.link_name().map_err(io_at(&out_path))?;
            if let Some(target) = target {
                create_parent(&out_path)?;
                create_symlink(&target, &out_path)?;
            }
        } else if entry_type.is_file() {
            create_parent(&out_path)?;
            let mut out = fs::File::create(&out_path).map_err(io_at(&out_path))?;
            io::copy(&mut entry, &mut out).map_err(io_at(&out_path))?;
            drop(out);

            let mode = entry.header().mode().unwrap_or(0);
            apply_mode(&out_path, mode)?;
        }

        ticker.tick();
    }

    Ok(ticker.count)
}

/// Strip `.` components; reject absolute paths and `..`. The archive root
/// itself (`./`) normalizes to an empty path.
fn normalize_entry_path(raw: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

fn create_parent(path: &Path) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> LauncherResult<()> {
    use std::os::unix::fs::PermissionsExt;
    if mode == 0 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)).map_err(io_at(path))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> LauncherResult<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> LauncherResult<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(io_at(link))?;
    }
    std::os::unix::fs::symlink(target, link).map_err(io_at(link))
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> LauncherResult<()> {
    debug!("Skipping symlink {:?} -> {:?}", link, target);
    Ok(())
}

/// Throttled extraction progress against an exact or estimated entry total.
struct ExtractTicker<'a> {
    stage: &'a StageProgress,
    label: &'a str,
    total: Option<usize>,
    count: usize,
    last_percent: Option<u8>,
    last_update: Instant,
}

impl<'a> ExtractTicker<'a> {
    fn new(stage: &'a StageProgress, label: &'a str, total: Option<usize>) -> Self {
        Self {
            stage,
            label,
            total,
            count: 0,
            last_percent: None,
            last_update: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.count += 1;
        if self.last_update.elapsed() <= UPDATE_INTERVAL {
            return;
        }

        let (percent, text) = match self.total {
            Some(0) => return,
            Some(total) => {
                let percent = (self.count * 100 / total).min(100) as u8;
                let text = format!(
                    "{}: {}/{} files ({}%)",
                    self.label, self.count, total, percent
                );
                (percent, text)
            }
            None => {
                let percent = (self.count * 100 / ESTIMATED_TAR_ENTRIES).min(99) as u8;
                let text = format!("{}: {} files ({}%)", self.label, self.count, percent);
                (percent, text)
            }
        };

        if self.last_percent != Some(percent) {
            self.stage.update(percent, &text);
            self.last_percent = Some(percent);
            self.last_update = Instant::now();
        }
    }
}

/// Move everything inside each top-level folder of `staging` into
/// `install_root`, overwriting existing files, then delete `staging`.
pub fn move_from_nested_folder(staging: &Path, install_root: &Path) -> LauncherResult<()> {
    fs::create_dir_all(install_root).map_err(io_at(install_root))?;

    for nested in fs::read_dir(staging).map_err(io_at(staging))? {
        let nested = nested.map_err(io_at(staging))?;
        if !nested.file_type().map_err(io_at(staging))?.is_dir() {
            continue;
        }

        let nested_dir = nested.path();
        debug!("Lifting {:?} into {:?}", nested_dir, install_root);
        for item in fs::read_dir(&nested_dir).map_err(io_at(&nested_dir))? {
            let item = item.map_err(io_at(&nested_dir))?;
            move_recursive(&item.path(), &install_root.join(item.file_name()))?;
        }
    }

    fs::remove_dir_all(staging).map_err(io_at(staging))
}

fn move_recursive(source: &Path, target: &Path) -> LauncherResult<()> {
    let file_type = fs::symlink_metadata(source)
        .map_err(io_at(source))?
        .file_type();

    if file_type.is_dir() {
        fs::create_dir_all(target).map_err(io_at(target))?;
        for child in fs::read_dir(source).map_err(io_at(source))? {
            let child = child.map_err(io_at(source))?;
            move_recursive(&child.path(), &target.join(child.file_name()))?;
        }
        return Ok(());
    }

    if let Ok(existing) = fs::symlink_metadata(target) {
        if existing.is_dir() {
            fs::remove_dir_all(target).map_err(io_at(target))?;
        } else {
            fs::remove_file(target).map_err(io_at(target))?;
        }
    }
    fs::rename(source, target).map_err(io_at(target))
}
