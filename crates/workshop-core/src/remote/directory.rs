//! Folder-backed remote platform.
//!
//! Stands in for a real content service: every subfolder of the root named
//! by a numeric id is a subscribed, installed item. Marker files inside an
//! item folder simulate platform state:
//! - `.needs_update`: the item is stale and should be re-copied
//! - `.downloading`: the item is not installed yet

use crate::error::{MirrorError, Result};
use crate::remote::{ItemState, RemotePlatform};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const NEEDS_UPDATE_MARKER: &str = ".needs_update";
const DOWNLOADING_MARKER: &str = ".downloading";
const UNSUBSCRIBED_SUFFIX: &str = ".unsubscribed";

/// A [`RemotePlatform`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryPlatform {
    root: PathBuf,
}

impl DirectoryPlatform {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_dir(&self, id: u64) -> PathBuf {
        self.root.join(id.to_string())
    }
}

#[async_trait]
impl RemotePlatform for DirectoryPlatform {
    async fn subscribed_items(&self) -> Result<Vec<u64>> {
        let entries = fs::read_dir(&self.root).map_err(|e| MirrorError::io_with_path(e, &self.root))?;

        let mut ids: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn item_state(&self, id: u64) -> Result<ItemState> {
        let dir = self.item_dir(id);
        if !dir.is_dir() {
            return Ok(ItemState::default());
        }
        Ok(ItemState {
            installed: !dir.join(DOWNLOADING_MARKER).exists(),
            needs_update: dir.join(NEEDS_UPDATE_MARKER).exists(),
        })
    }

    async fn install_info(&self, id: u64) -> Result<Option<PathBuf>> {
        let dir = self.item_dir(id);
        if dir.is_dir() && !dir.join(DOWNLOADING_MARKER).exists() {
            Ok(Some(dir))
        } else {
            Ok(None)
        }
    }

    async fn request_download(&self, id: u64, _high_priority: bool) -> Result<bool> {
        let dir = self.item_dir(id);
        if !dir.is_dir() {
            return Ok(false);
        }

        // Content in the folder is already the latest; the download is
        // "complete" as soon as it is requested.
        let marker = dir.join(NEEDS_UPDATE_MARKER);
        if marker.exists() {
            fs::remove_file(&marker).map_err(|e| MirrorError::io_with_path(e, &marker))?;
            debug!("Cleared update marker for item {}", id);
        }
        Ok(true)
    }

    async fn unsubscribe(&self, id: u64) -> Result<()> {
        let dir = self.item_dir(id);
        if !dir.is_dir() {
            return Ok(());
        }

        let parked = self.root.join(format!("{}{}", id, UNSUBSCRIBED_SUFFIX));
        if parked.exists() {
            fs::remove_dir_all(&parked).map_err(|e| MirrorError::io_with_path(e, &parked))?;
        }
        fs::rename(&dir, &parked).map_err(|e| MirrorError::io_with_path(e, &dir))?;
        info!("Unsubscribed from item {}", id);
        Ok(())
    }
}
