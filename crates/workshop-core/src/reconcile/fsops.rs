//! File operations used while applying a pass.
//!
//! Copies are fallible and reported to the caller. Deletes are
//! fire-and-forget: a failure is logged and the pass moves on.

use crate::config::SyncConfig;
use crate::error::{MirrorError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Copy `src` to `dest` unless `dest` already exists and `overwrite` is off.
///
/// The copy lands in a temp file next to `dest` and is renamed into place,
/// so an interrupted copy never leaves a truncated file behind.
/// Returns whether a copy happened.
pub fn copy_if_needed(src: &Path, dest: &Path, overwrite: bool) -> Result<bool> {
    if dest.exists() && !overwrite {
        return Ok(false);
    }

    let parent = dest
        .parent()
        .ok_or_else(|| MirrorError::Other(format!("No parent for {}", dest.display())))?;
    fs::create_dir_all(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;

    let input = File::open(src).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MirrorError::FileNotFound(src.to_path_buf()),
        _ => MirrorError::io_with_path(e, src),
    })?;
    let mut reader = BufReader::with_capacity(SyncConfig::COPY_BUFFER_SIZE, input);

    let temp = NamedTempFile::new_in(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;
    let mut writer = BufWriter::with_capacity(SyncConfig::COPY_BUFFER_SIZE, temp);
    io::copy(&mut reader, &mut writer).map_err(|e| MirrorError::io_with_path(e, src))?;
    writer.flush().map_err(|e| MirrorError::io_with_path(e, dest))?;

    let temp = writer
        .into_inner()
        .map_err(|e| MirrorError::io_with_path(e.into_error(), dest))?;
    temp.persist(dest)
        .map_err(|e| MirrorError::io_with_path(e.error, dest))?;

    debug!("Copied {} -> {}", src.display(), dest.display());
    Ok(true)
}

/// Delete a file, ignoring a missing one.
pub fn remove_file_quiet(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete a directory tree, ignoring a missing one.
pub fn remove_dir_quiet(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Deleted folder {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to delete folder {}: {}", path.display(), e);
            false
        }
    }
}
