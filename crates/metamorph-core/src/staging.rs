//! Staging of the application tree
//!
//! Before any operation runs, the pipeline decides which folder operations act
//! on:
//! - in place: the original folder
//! - new folder: a full copy named `<original>-<suffix>-<yyyyMMddHHmmssSSS>`,
//!   created next to the original or inside the configured output folder
//!
//! Copies keep permissions, modification times and symlinks. When
//! compression is requested, the staged folder is zipped into
//! `<staged>.zip` next to it once the operations are done.

use crate::config::{Configuration, OutputMode};
use crate::error::EnvironmentError;
use chrono::Local;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Resolve the folder the operations will act on, copying if needed
///
/// # Errors
/// `EnvironmentError::Staging` when the copy cannot be made.
pub(crate) fn stage(
    application: &Path,
    configuration: &Configuration,
    folder_suffix: &str,
) -> Result<PathBuf, EnvironmentError> {
    if configuration.mode() == OutputMode::InPlace {
        return Ok(application.to_path_buf());
    }

    let source = application
        .canonicalize()
        .map_err(|e| EnvironmentError::staging(application, e))?;
    let name = source
        .file_name()
        .map_or_else(|| "application".into(), |n| n.to_string_lossy().into_owned());
    let parent = match configuration.output_folder() {
        Some(folder) => folder.to_path_buf(),
        None => source
            .parent()
            .map_or_else(|| source.clone(), Path::to_path_buf),
    };

    let stamp = Local::now().format(TIMESTAMP_FORMAT);
    let destination = claim_folder(&parent, &format!("{name}-{folder_suffix}-{stamp}"))?;

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "staging application copy"
    );
    fill_or_discard(destination, |folder| copy_tree(&source, folder))
}

/// Populate a freshly claimed folder, removing it again if `fill` fails
fn fill_or_discard(
    destination: PathBuf,
    fill: impl FnOnce(&Path) -> Result<(), EnvironmentError>,
) -> Result<PathBuf, EnvironmentError> {
    if let Err(e) = fill(&destination) {
        if let Err(cleanup) = fs::remove_dir_all(&destination) {
            tracing::warn!(
                destination = %destination.display(),
                error = %cleanup,
                "could not remove partial application copy"
            );
        }
        return Err(e);
    }
    Ok(destination)
}

/// Create a fresh folder, appending a counter if the name is taken
fn claim_folder(parent: &Path, base: &str) -> Result<PathBuf, EnvironmentError> {
    let mut attempt = 0_u32;
    loop {
        let candidate = if attempt == 0 {
            parent.join(base)
        } else {
            parent.join(format!("{base}-{attempt}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(EnvironmentError::staging(candidate, e)),
        }
    }
}

/// Recursively copy `source` into the existing folder `destination`
///
/// # Errors
/// `EnvironmentError::Staging` naming the entry that failed.
pub(crate) fn copy_tree(source: &Path, destination: &Path) -> Result<(), EnvironmentError> {
    let mut directories = vec![(source.to_path_buf(), destination.to_path_buf())];

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| source.to_path_buf(), Path::to_path_buf);
            EnvironmentError::staging(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| EnvironmentError::staging(entry.path(), io::Error::other(e)))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&target).map_err(|e| EnvironmentError::staging(&target, e))?;
            directories.push((entry.path().to_path_buf(), target));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
                .map_err(|e| EnvironmentError::staging(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| EnvironmentError::staging(&target, e))?;
            let modified = entry
                .metadata()
                .map_err(|e| EnvironmentError::staging(entry.path(), e.into()))?
                .modified()
                .map_err(|e| EnvironmentError::staging(entry.path(), e))?;
            set_modified(&target, modified).map_err(|e| EnvironmentError::staging(&target, e))?;
        }
    }

    // deepest first, after their contents are in place
    for (source_dir, target_dir) in directories.iter().rev() {
        let metadata =
            fs::metadata(source_dir).map_err(|e| EnvironmentError::staging(source_dir, e))?;
        fs::set_permissions(target_dir, metadata.permissions())
            .map_err(|e| EnvironmentError::staging(target_dir, e))?;
        #[cfg(unix)]
        {
            let modified = metadata
                .modified()
                .map_err(|e| EnvironmentError::staging(source_dir, e))?;
            set_modified(target_dir, modified)
                .map_err(|e| EnvironmentError::staging(target_dir, e))?;
        }
    }

    Ok(())
}

fn set_modified(path: &Path, modified: SystemTime) -> io::Result<()> {
    #[cfg(unix)]
    let file = File::open(path)?;
    #[cfg(not(unix))]
    let file = File::options().write(true).open(path)?;
    file.set_modified(modified)
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(source)?, target)
}

#[cfg(windows)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    if fs::metadata(source).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(source: &Path, _target: &Path) -> io::Result<()> {
    tracing::warn!(path = %source.display(), "symlinks unsupported on this platform, skipped");
    Ok(())
}

/// Zip `folder` into `<folder>.zip` next to it
///
/// Entry names are relative to `folder` and use `/`. Symlinks are skipped.
///
/// # Errors
/// `EnvironmentError::Compression` naming the archive.
pub(crate) fn compress(folder: &Path) -> Result<PathBuf, EnvironmentError> {
    let name = folder
        .file_name()
        .map_or_else(|| "application".into(), |n| n.to_string_lossy().into_owned());
    let archive = folder
        .parent()
        .map_or_else(|| PathBuf::from(format!("{name}.zip")), |p| p.join(format!("{name}.zip")));

    let file = File::create(&archive).map_err(|e| EnvironmentError::compression(&archive, e))?;
    let mut writer = ZipWriter::new(file);

    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| EnvironmentError::compression(&archive, io::Error::from(e)))?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink in archive");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(folder)
            .map_err(|e| EnvironmentError::compression(&archive, io::Error::other(e)))?;
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let metadata = entry
            .metadata()
            .map_err(|e| EnvironmentError::compression(&archive, io::Error::from(e)))?;
        let options = entry_options(&metadata);

        if file_type.is_dir() {
            writer
                .add_directory(format!("{entry_name}/"), options)
                .map_err(|e| EnvironmentError::compression(&archive, e))?;
        } else {
            writer
                .start_file(entry_name, options.large_file(metadata.len() >= u64::from(u32::MAX)))
                .map_err(|e| EnvironmentError::compression(&archive, e))?;
            let mut source =
                File::open(entry.path()).map_err(|e| EnvironmentError::compression(&archive, e))?;
            io::copy(&mut source, &mut writer)
                .map_err(|e| EnvironmentError::compression(&archive, e))?;
        }
    }

    writer
        .finish()
        .map_err(|e| EnvironmentError::compression(&archive, e))?;
    Ok(archive)
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };
    options
}
