//! Avatar side of a pass: mirror files, merge entries, evict.

use super::fsops::{copy_if_needed, remove_file_quiet};
use crate::classify::{extract_entry, AvatarMetadata, Classification, ContentKind};
use crate::config::{normalize_path, ContentConfig, MirrorPaths};
use crate::remote::{RemoteItem, Snapshot};
use crate::store::AvatarEntry;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Working copy of the avatar entries for one pass.
pub(super) struct AvatarSync<'a> {
    paths: &'a MirrorPaths,
    pub entries: Vec<AvatarEntry>,
    pub changed: bool,
    pub added: usize,
    pub updated: usize,
    pub evicted: usize,
    pub demoted: usize,
}

impl<'a> AvatarSync<'a> {
    pub fn new(paths: &'a MirrorPaths, entries: Vec<AvatarEntry>) -> Self {
        Self {
            paths,
            entries,
            changed: false,
            added: 0,
            updated: 0,
            evicted: 0,
            demoted: 0,
        }
    }

    /// Mirror one classified avatar and bring its entry up to date.
    pub fn sync(&mut self, item: &RemoteItem, classification: &Classification) {
        let Some(file_name) = classification.file_name() else {
            return;
        };
        let target = self.target_path(item.remote_id, file_name);

        let copied = match copy_if_needed(&classification.file, &target, item.needs_update) {
            Ok(copied) => copied,
            Err(e) => {
                warn!("Skipping avatar from item {}: {}", item.remote_id, e);
                return;
            }
        };

        let (thumbnail, thumbnail_copied) =
            self.sync_thumbnail(item, classification, &target, copied);
        let metadata = classification.metadata.clone().unwrap_or_else(|| {
            AvatarMetadata::defaults_for(
                &classification.file,
                classification.kind == ContentKind::AvatarPackage,
            )
        });
        let target_str = target.to_string_lossy().into_owned();

        match self.position_of(&target) {
            None => {
                info!("Adding avatar {} from item {}", target.display(), item.remote_id);
                self.entries.push(AvatarEntry {
                    display_name: metadata.display_name,
                    author: metadata.author,
                    version: metadata.version,
                    file_type: metadata.file_type,
                    file_path: target_str,
                    thumbnail_path: thumbnail.unwrap_or_default(),
                    polygon_count: metadata.polygon_count,
                    is_nsfw: metadata.is_nsfw,
                    is_steam_workshop: true,
                    remote_id: item.remote_id,
                    is_owner: false,
                    extra: Default::default(),
                });
                self.added += 1;
                self.changed = true;
            }
            Some(index) => {
                let entry = &mut self.entries[index];
                let merged = merge_entry(entry, &metadata, thumbnail, item.remote_id);
                if merged || copied || thumbnail_copied {
                    debug!("Updated avatar {}", target.display());
                    self.updated += 1;
                    self.changed = true;
                }
            }
        }
    }

    /// Drop or demote entries whose subscription is gone.
    pub fn evict(&mut self, snapshot: &Snapshot) {
        let paths = self.paths;
        let mut kept = Vec::with_capacity(self.entries.len());

        for mut entry in std::mem::take(&mut self.entries) {
            if !entry.is_synced() || snapshot.is_subscribed(entry.remote_id) {
                kept.push(entry);
                continue;
            }

            if paths.is_managed_avatar(entry.path()) {
                info!("Evicting avatar {} (item {})", entry.file_path, entry.remote_id);
                remove_file_quiet(entry.path());
                let thumbnail = Path::new(&entry.thumbnail_path);
                if paths.is_managed_thumbnail(thumbnail) {
                    remove_file_quiet(thumbnail);
                }
                self.evicted += 1;
            } else {
                info!(
                    "Item {} unsubscribed, keeping user-owned avatar {}",
                    entry.remote_id, entry.file_path
                );
                entry.is_steam_workshop = false;
                self.demoted += 1;
                kept.push(entry);
            }
            self.changed = true;
        }

        self.entries = kept;
    }

    /// `<avatars>/<name>`, or `<avatars>/<id>_<name>` when another item
    /// already claims the bare name. An item that already lives under its
    /// prefixed name stays there.
    fn target_path(&self, remote_id: u64, file_name: &str) -> PathBuf {
        let avatars_dir = self.paths.avatars_dir();
        let prefixed = avatars_dir.join(format!("{}_{}", remote_id, file_name));
        if self.owner_of(&prefixed) == Some(remote_id) {
            return prefixed;
        }

        let bare = avatars_dir.join(file_name);
        let claimed_by_other = self
            .owner_of(&bare)
            .is_some_and(|owner| owner != 0 && owner != remote_id);

        if claimed_by_other {
            debug!(
                "{} belongs to another item, using {}",
                bare.display(),
                prefixed.display()
            );
            prefixed
        } else {
            bare
        }
    }

    fn owner_of(&self, target: &Path) -> Option<u64> {
        self.position_of(target).map(|i| self.entries[i].remote_id)
    }

    fn position_of(&self, target: &Path) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.file_path.is_empty() && normalize_path(e.path()) == target)
    }

    /// Make sure the mirrored thumbnail exists. Returns its path, if any,
    /// and whether a file was written.
    fn sync_thumbnail(
        &self,
        item: &RemoteItem,
        classification: &Classification,
        target: &Path,
        model_copied: bool,
    ) -> (Option<String>, bool) {
        let Some(target_stem) = target.file_stem().and_then(|s| s.to_str()) else {
            return (None, false);
        };
        let dest = self.paths.thumbnail_for(target_stem);

        let mut written = false;
        if model_copied || !dest.exists() {
            written = self.copy_thumbnail(item, classification, target_stem, &dest);
        }

        let thumbnail = dest
            .exists()
            .then(|| dest.to_string_lossy().into_owned());
        (thumbnail, written)
    }

    fn copy_thumbnail(
        &self,
        item: &RemoteItem,
        classification: &Classification,
        target_stem: &str,
        dest: &Path,
    ) -> bool {
        let suffix = ContentConfig::THUMBNAIL_SUFFIX;
        let mut candidates = Vec::new();
        if let Some(stem) = classification.file_stem() {
            candidates.push(item.install_path.join(format!("{}{}", stem, suffix)));
        }
        candidates.push(self.paths.avatars_dir().join(format!("{}{}", target_stem, suffix)));

        if let Some(source) = candidates.into_iter().find(|c| c.is_file()) {
            return match copy_if_needed(&source, dest, true) {
                Ok(copied) => copied,
                Err(e) => {
                    warn!("Failed to copy thumbnail for {}: {}", target_stem, e);
                    false
                }
            };
        }

        if classification.has_embedded_thumbnail() {
            match extract_entry(&classification.file, ContentConfig::PACKAGE_THUMB_ENTRY, dest) {
                Ok(extracted) => return extracted,
                Err(e) => warn!("Failed to extract thumbnail for {}: {}", target_stem, e),
            }
        }
        false
    }
}

/// Merge fresh metadata into an existing entry. Returns whether any field
/// actually changed.
///
/// Never clears a thumbnail, never touches `isOwner` or host fields.
fn merge_entry(
    entry: &mut AvatarEntry,
    metadata: &AvatarMetadata,
    thumbnail: Option<String>,
    remote_id: u64,
) -> bool {
    let mut changed = false;
    changed |= set_if_differs(&mut entry.display_name, &metadata.display_name);
    changed |= set_if_differs(&mut entry.author, &metadata.author);
    changed |= set_if_differs(&mut entry.version, &metadata.version);
    changed |= set_if_differs(&mut entry.file_type, &metadata.file_type);
    changed |= set_if_differs(&mut entry.polygon_count, &metadata.polygon_count);
    changed |= set_if_differs(&mut entry.is_nsfw, &metadata.is_nsfw);

    if let Some(thumbnail) = thumbnail.filter(|t| !t.is_empty()) {
        changed |= set_if_differs(&mut entry.thumbnail_path, &thumbnail);
    }

    if entry.remote_id == 0 {
        entry.remote_id = remote_id;
        entry.is_steam_workshop = true;
        changed = true;
    } else if entry.remote_id == remote_id && !entry.is_steam_workshop {
        entry.is_steam_workshop = true;
        changed = true;
    }
    changed
}

fn set_if_differs<T: PartialEq + Clone>(field: &mut T, value: &T) -> bool {
    if field == value {
        return false;
    }
    *field = value.clone();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, remote_id: u64) -> AvatarEntry {
        AvatarEntry {
            display_name: "Old".into(),
            author: "Workshop".into(),
            version: "1.0".into(),
            file_type: "VRM".into(),
            file_path: path.into(),
            thumbnail_path: "/data/Thumbnails/a_thumb.png".into(),
            is_steam_workshop: remote_id != 0,
            remote_id,
            is_owner: true,
            ..Default::default()
        }
    }

    fn metadata(name: &str) -> AvatarMetadata {
        AvatarMetadata {
            display_name: name.into(),
            author: "Workshop".into(),
            version: "1.0".into(),
            file_type: "VRM".into(),
            polygon_count: 0,
            is_nsfw: false,
        }
    }

    #[test]
    fn test_merge_only_flags_real_changes() {
        let mut e = entry("/data/Steam Workshop/a.vrm", 10);
        assert!(!merge_entry(&mut e, &metadata("Old"), None, 10));
        assert!(merge_entry(&mut e, &metadata("New"), None, 10));
        assert_eq!(e.display_name, "New");
        assert!(e.is_owner);
    }

    #[test]
    fn test_merge_never_clears_thumbnail() {
        let mut e = entry("/data/Steam Workshop/a.vrm", 10);
        assert!(!merge_entry(&mut e, &metadata("Old"), Some(String::new()), 10));
        assert_eq!(e.thumbnail_path, "/data/Thumbnails/a_thumb.png");
    }

    #[test]
    fn test_merge_backfills_remote_id() {
        let mut e = entry("/data/Steam Workshop/a.vrm", 0);
        assert!(merge_entry(&mut e, &metadata("Old"), None, 42));
        assert_eq!(e.remote_id, 42);
        assert!(e.is_steam_workshop);
    }

    #[test]
    fn test_target_path_collision() {
        let paths = MirrorPaths::new("/data");
        let bare = paths.avatars_dir().join("a.vrm");
        let entries = vec![entry(&bare.to_string_lossy(), 10)];
        let sync = AvatarSync::new(&paths, entries);

        assert_eq!(sync.target_path(10, "a.vrm"), bare);
        assert_eq!(
            sync.target_path(20, "a.vrm"),
            paths.avatars_dir().join("20_a.vrm")
        );
        assert_eq!(
            sync.target_path(20, "b.vrm"),
            paths.avatars_dir().join("b.vrm")
        );
    }

    #[test]
    fn test_prefixed_entry_keeps_its_path_once_bare_name_frees_up() {
        let paths = MirrorPaths::new("/data");
        let prefixed = paths.avatars_dir().join("20_a.vrm");
        let sync = AvatarSync::new(&paths, vec![entry(&prefixed.to_string_lossy(), 20)]);

        assert_eq!(sync.target_path(20, "a.vrm"), prefixed);
        assert_eq!(
            sync.target_path(30, "a.vrm"),
            paths.avatars_dir().join("a.vrm")
        );
    }

    #[test]
    fn test_unclaimed_path_is_not_a_collision() {
        let paths = MirrorPaths::new("/data");
        let bare = paths.avatars_dir().join("a.vrm");
        let sync = AvatarSync::new(&paths, vec![entry(&bare.to_string_lossy(), 0)]);

        assert_eq!(sync.target_path(20, "a.vrm"), bare);
    }
}
