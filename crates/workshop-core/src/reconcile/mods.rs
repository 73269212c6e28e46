//! Mod side of a pass: mirror packages, record ownership, evict.

use super::fsops::{copy_if_needed, remove_dir_quiet, remove_file_quiet};
use super::SyncedMod;
use crate::classify::{extract_entry, Classification};
use crate::config::{is_within, ContentConfig, MirrorPaths};
use crate::remote::{RemoteItem, Snapshot};
use crate::store::ModMapping;
use std::path::Path;
use tracing::{debug, info, warn};

pub(super) struct ModSync<'a> {
    paths: &'a MirrorPaths,
    pub mapping: ModMapping,
    pub changed: bool,
    pub copied: usize,
    pub evicted: usize,
    pub synced: Vec<SyncedMod>,
}

impl<'a> ModSync<'a> {
    pub fn new(paths: &'a MirrorPaths, mapping: ModMapping) -> Self {
        Self {
            paths,
            mapping,
            changed: false,
            copied: 0,
            evicted: 0,
            synced: Vec::new(),
        }
    }

    pub fn sync(&mut self, item: &RemoteItem, classification: &Classification) {
        let (Some(file_name), Some(stem)) = (classification.file_name(), classification.file_stem())
        else {
            return;
        };
        let dest = self.paths.mods_dir().join(file_name);

        // Unsubscribed rows are gone by now, so any other owner is live
        if let Some(owner) = self.mapping.get(file_name).filter(|&id| id != item.remote_id) {
            warn!(
                "Item {} ships {}, already mirrored from item {}; skipping",
                item.remote_id, file_name, owner
            );
            return;
        }

        let copied = match copy_if_needed(&classification.file, &dest, item.needs_update) {
            Ok(copied) => copied,
            Err(e) => {
                warn!("Skipping mod from item {}: {}", item.remote_id, e);
                return;
            }
        };
        if copied {
            info!(
                "Synced {} {} from item {}",
                classification.kind, file_name, item.remote_id
            );
            self.copied += 1;
            self.changed = true;
        }

        if self.mapping.record(file_name, item.remote_id) {
            debug!("Mapped {} to item {}", file_name, item.remote_id);
            self.changed = true;
        }

        if classification.has_embedded_thumbnail() {
            let thumbnail = self.paths.thumbnail_for(stem);
            if copied || !thumbnail.exists() {
                let entry = ContentConfig::PACKAGE_THUMB_ENTRY;
                match extract_entry(&classification.file, entry, &thumbnail) {
                    Ok(true) => self.changed = true,
                    Ok(false) => {}
                    Err(e) => warn!("Failed to extract thumbnail for {}: {}", file_name, e),
                }
            }
        }

        self.synced.push(SyncedMod {
            file_name: file_name.to_string(),
            remote_id: item.remote_id,
            kind: classification.kind,
            author: classification.package.as_ref().and_then(|p| p.author.clone()),
        });
    }

    /// Delete mods, caches and thumbnails of unsubscribed items.
    pub fn evict(&mut self, snapshot: &Snapshot) {
        let stale: Vec<(String, u64)> = self
            .mapping
            .iter()
            .filter(|(_, id)| !snapshot.is_subscribed(*id))
            .map(|(name, id)| (name.to_string(), id))
            .collect();

        for (file_name, remote_id) in stale {
            info!("Evicting mod {} (item {})", file_name, remote_id);
            self.remove_artifacts(&file_name);
            self.mapping.remove(&file_name);
            self.evicted += 1;
            self.changed = true;
        }
    }

    fn remove_artifacts(&self, file_name: &str) {
        let mods_dir = self.paths.mods_dir();
        let file = mods_dir.join(file_name);
        if !is_within(&file, &mods_dir) {
            warn!("Mapped mod {} is outside the mods folder, leaving it", file_name);
            return;
        }
        remove_file_quiet(&file);

        let Some(stem) = Path::new(file_name).file_stem().and_then(|s| s.to_str()) else {
            return;
        };
        remove_dir_quiet(&self.paths.mod_cache_dir(stem));
        remove_file_quiet(&self.paths.thumbnail_for(stem));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_evict_removes_artifacts_of_unsubscribed_rows() {
        let temp = TempDir::new().unwrap();
        let paths = MirrorPaths::new(temp.path());
        fs::create_dir_all(paths.mods_dir()).unwrap();
        fs::create_dir_all(paths.mod_cache_dir("gone").join("meshes")).unwrap();
        fs::create_dir_all(paths.thumbnails_dir()).unwrap();
        fs::write(paths.mods_dir().join("gone.me"), "x").unwrap();
        fs::write(paths.mods_dir().join("kept.me"), "x").unwrap();
        fs::write(paths.thumbnail_for("gone"), "png").unwrap();

        let mapping: ModMapping = [("gone.me".to_string(), 1), ("kept.me".to_string(), 2)]
            .into_iter()
            .collect();
        let snapshot = Snapshot {
            items: Vec::new(),
            subscribed: [2].into_iter().collect(),
        };

        let mut sync = ModSync::new(&paths, mapping);
        sync.evict(&snapshot);

        assert!(sync.changed);
        assert_eq!(sync.evicted, 1);
        assert_eq!(sync.mapping.get("gone.me"), None);
        assert_eq!(sync.mapping.get("kept.me"), Some(2));
        assert!(!paths.mods_dir().join("gone.me").exists());
        assert!(!paths.mod_cache_dir("gone").exists());
        assert!(!paths.thumbnail_for("gone").exists());
        assert!(paths.mods_dir().join("kept.me").exists());
    }

    #[test]
    fn test_evict_leaves_paths_outside_mods_folder() {
        let temp = TempDir::new().unwrap();
        let paths = MirrorPaths::new(temp.path().join("data"));
        let outside = temp.path().join("precious.me");
        fs::write(&outside, "x").unwrap();

        let mapping: ModMapping = [("../../precious.me".to_string(), 1)].into_iter().collect();
        let mut sync = ModSync::new(&paths, mapping);
        sync.evict(&Snapshot::default());

        assert!(outside.exists());
        assert!(sync.mapping.is_empty());
    }
}
