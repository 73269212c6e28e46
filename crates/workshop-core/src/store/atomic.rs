//! Atomic file operations for safe JSON persistence.
//!
//! Writes go through a named temp file in the target's directory:
//! 1. Serialize and validate the document
//! 2. Write and fsync the temp file
//! 3. Optionally copy the current document to `.bak`
//! 4. Rename the temp file over the target
//!
//! A reader therefore sees either the old or the new document, never a
//! truncated one.

use crate::error::{MirrorError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MirrorError::io_with_path(e, path)),
    };

    let data = serde_json::from_str(&contents).map_err(|e| MirrorError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically, optionally keeping a `.bak` of the
/// previous contents.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;

    let serialized = serde_json::to_string_pretty(data).map_err(|e| MirrorError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    // Guard against writing something we could not read back
    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| MirrorError::Json {
        message: format!("JSON validation failed for {}: {}", path.display(), e),
        source: Some(e),
    })?;

    let mut temp =
        NamedTempFile::new_in(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;
    temp.write_all(serialized.as_bytes())
        .and_then(|_| temp.flush())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| MirrorError::io_with_path(e, temp.path()))?;

    if keep_backup && path.exists() {
        let backup_path = path.with_extension("json.bak");
        match fs::copy(path, &backup_path) {
            Ok(_) => debug!("Created backup: {}", backup_path.display()),
            Err(e) => warn!("Failed to create backup {}: {}", backup_path.display(), e),
        }
    }

    temp.persist(path)
        .map_err(|e| MirrorError::io_with_path(e.error, path))?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}
