//! Local store for the two persisted collections.
//!
//! Manages:
//! - avatars.json (ordered avatar entries, shared with the host library)
//! - mods_workshop_map.json (mod file name → remote id)

use crate::config::MirrorPaths;
use crate::error::Result;
use crate::store::atomic::{atomic_read_json, atomic_write_json};
use crate::store::types::{AvatarEntry, ModMapping};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Typed access to the store documents.
///
/// Holds no cached state: every load reads the document fresh, so each
/// reconciliation pass starts from what is on disk.
#[derive(Debug, Clone)]
pub struct LocalStore {
    avatars_path: PathBuf,
    mod_map_path: PathBuf,
    keep_backups: bool,
}

impl LocalStore {
    /// Create a store over the documents in `paths`.
    pub fn new(paths: &MirrorPaths, keep_backups: bool) -> Self {
        Self {
            avatars_path: paths.avatars_store_path(),
            mod_map_path: paths.mod_map_store_path(),
            keep_backups,
        }
    }

    // ========================================
    // Avatar entries
    // ========================================

    /// Load avatar entries. A missing document is an empty library.
    pub fn load_avatars(&self) -> Result<Vec<AvatarEntry>> {
        debug!("Loading avatars from {}", self.avatars_path.display());
        Ok(atomic_read_json(&self.avatars_path)?.unwrap_or_default())
    }

    /// Load avatar entries, treating an unreadable document as empty.
    pub fn load_avatars_lenient(&self) -> Vec<AvatarEntry> {
        self.load_avatars().unwrap_or_else(|e| {
            warn!("Ignoring unreadable avatar store: {}", e);
            Vec::new()
        })
    }

    pub fn save_avatars(&self, entries: &[AvatarEntry]) -> Result<()> {
        debug!(
            "Saving {} avatars to {}",
            entries.len(),
            self.avatars_path.display()
        );
        atomic_write_json(&self.avatars_path, &entries, self.keep_backups)
    }

    // ========================================
    // Mod mapping
    // ========================================

    /// Load the mod mapping. A missing document is an empty mapping.
    pub fn load_mod_map(&self) -> Result<ModMapping> {
        debug!("Loading mod mapping from {}", self.mod_map_path.display());
        Ok(atomic_read_json(&self.mod_map_path)?.unwrap_or_default())
    }

    /// Load the mod mapping, treating an unreadable document as empty.
    pub fn load_mod_map_lenient(&self) -> ModMapping {
        self.load_mod_map().unwrap_or_else(|e| {
            warn!("Ignoring unreadable mod mapping: {}", e);
            ModMapping::new()
        })
    }

    pub fn save_mod_map(&self, mapping: &ModMapping) -> Result<()> {
        debug!(
            "Saving {} mod mappings to {}",
            mapping.len(),
            self.mod_map_path.display()
        );
        atomic_write_json(&self.mod_map_path, mapping, self.keep_backups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(&MirrorPaths::new(temp_dir.path()), false);
        (store, temp_dir)
    }

    #[test]
    fn test_empty_store() {
        let (store, _temp) = create_test_store();
        assert!(store.load_avatars().unwrap().is_empty());
        assert!(store.load_mod_map().unwrap().is_empty());
    }

    #[test]
    fn test_avatars_roundtrip_keeps_order() {
        let (store, _temp) = create_test_store();
        let entries = vec![
            AvatarEntry {
                file_path: "/b.vrm".into(),
                ..Default::default()
            },
            AvatarEntry {
                file_path: "/a.vrm".into(),
                ..Default::default()
            },
        ];

        store.save_avatars(&entries).unwrap();
        let loaded = store.load_avatars().unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_mod_map_roundtrip() {
        let (store, _temp) = create_test_store();
        let mut mapping = ModMapping::new();
        mapping.record("dance.me", 77);

        store.save_mod_map(&mapping).unwrap();
        assert_eq!(store.load_mod_map().unwrap().get("dance.me"), Some(77));
    }

    #[test]
    fn test_lenient_load_of_corrupt_documents() {
        let (store, temp) = create_test_store();
        std::fs::write(temp.path().join("avatars.json"), "[{").unwrap();
        std::fs::write(temp.path().join("mods_workshop_map.json"), "nope").unwrap();

        assert!(store.load_avatars().is_err());
        assert!(store.load_avatars_lenient().is_empty());
        assert!(store.load_mod_map_lenient().is_empty());
    }
}
