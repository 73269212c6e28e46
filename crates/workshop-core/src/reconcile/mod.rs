//! Reconciliation of a snapshot against the local store.
//!
//! One pass:
//! 1. Load both store documents fresh
//! 2. Evict state whose subscription is gone
//! 3. Classify and mirror each snapshot item
//! 4. Save each document only if it changed
//!
//! Eviction only touches unsubscribed ids and every snapshot item is
//! subscribed, so running it first leaves the same end state while freeing
//! file names for the items mirrored after it.
//!
//! Every step below the pass level logs and swallows its own failures, so
//! the pass itself cannot fail.

mod avatars;
mod fsops;
mod mods;

use crate::classify::{classify_item, ContentKind};
use crate::config::MirrorPaths;
use crate::remote::Snapshot;
use crate::store::LocalStore;
use avatars::AvatarSync;
use chrono::{DateTime, Utc};
use mods::ModSync;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A mod seen during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedMod {
    pub file_name: String,
    pub remote_id: u64,
    pub kind: ContentKind,
    pub author: Option<String>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub pass_number: u64,
    pub avatars_changed: bool,
    pub mods_changed: bool,
    pub avatars_added: usize,
    pub avatars_updated: usize,
    pub avatars_evicted: usize,
    pub avatars_demoted: usize,
    pub mods_synced: usize,
    pub mods_evicted: usize,
    /// Subscribed items that were not installed in time.
    pub skipped: Vec<u64>,
    /// Installed items with no recognizable payload.
    pub ignored: Vec<u64>,
    pub mods: Vec<SyncedMod>,
    pub completed_at: DateTime<Utc>,
}

impl PassReport {
    pub fn has_changes(&self) -> bool {
        self.avatars_changed || self.mods_changed
    }
}

/// Applies snapshots to the mirror directories and the store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    paths: MirrorPaths,
    store: LocalStore,
}

impl Reconciler {
    pub fn new(paths: MirrorPaths, store: LocalStore) -> Self {
        Self { paths, store }
    }

    pub fn paths(&self) -> &MirrorPaths {
        &self.paths
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Run one pass over `snapshot`. Blocking; call from a worker thread.
    pub fn run(&self, snapshot: &Snapshot, pass_number: u64) -> PassReport {
        let mut avatars = AvatarSync::new(&self.paths, self.store.load_avatars_lenient());
        let mut mods = ModSync::new(&self.paths, self.store.load_mod_map_lenient());
        let mut ignored = Vec::new();

        avatars.evict(snapshot);
        mods.evict(snapshot);

        for item in &snapshot.items {
            let Some(classification) = classify_item(&item.install_path) else {
                debug!(
                    "Item {} has no usable payload in {}",
                    item.remote_id,
                    item.install_path.display()
                );
                ignored.push(item.remote_id);
                continue;
            };

            if classification.kind.is_avatar() {
                avatars.sync(item, &classification);
            } else {
                mods.sync(item, &classification);
            }
        }

        if avatars.changed {
            if let Err(e) = self.store.save_avatars(&avatars.entries) {
                warn!("Failed to save avatars, will retry next pass: {}", e);
            }
        }
        if mods.changed {
            if let Err(e) = self.store.save_mod_map(&mods.mapping) {
                warn!("Failed to save mod mapping, will retry next pass: {}", e);
            }
        }

        let report = PassReport {
            pass_number,
            avatars_changed: avatars.changed,
            mods_changed: mods.changed,
            avatars_added: avatars.added,
            avatars_updated: avatars.updated,
            avatars_evicted: avatars.evicted,
            avatars_demoted: avatars.demoted,
            mods_synced: mods.copied,
            mods_evicted: mods.evicted,
            skipped: snapshot.skipped(),
            ignored,
            mods: mods.synced,
            completed_at: Utc::now(),
        };

        info!(
            "Pass {} done: avatars +{} ~{} -{} (demoted {}), mods +{} -{}, {} skipped",
            report.pass_number,
            report.avatars_added,
            report.avatars_updated,
            report.avatars_evicted,
            report.avatars_demoted,
            report.mods_synced,
            report.mods_evicted,
            report.skipped.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteItem;
    use crate::test_support::{write_item, write_package};
    use std::path::Path;
    use tempfile::TempDir;

    fn reconciler(data_root: &Path) -> Reconciler {
        let paths = MirrorPaths::new(data_root);
        let store = LocalStore::new(&paths, false);
        Reconciler::new(paths, store)
    }

    fn item(root: &Path, id: u64) -> RemoteItem {
        RemoteItem {
            remote_id: id,
            install_path: root.join(id.to_string()),
            needs_update: false,
        }
    }

    fn snapshot(items: Vec<RemoteItem>) -> Snapshot {
        let subscribed = items.iter().map(|i| i.remote_id).collect();
        Snapshot { items, subscribed }
    }

    #[test]
    fn test_mixed_pass() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote");
        write_item(&remote.join("1"), &[("a.vrm", "model"), ("a_thumb.png", "png")]);
        write_package(&remote.join("2").join("d.me"), &[("dance_meta.json", "{}")]);
        write_item(&remote.join("3"), &[("readme.txt", "hi")]);

        let r = reconciler(&temp.path().join("data"));
        let report = r.run(
            &snapshot(vec![item(&remote, 1), item(&remote, 2), item(&remote, 3)]),
            1,
        );

        assert!(report.avatars_changed && report.mods_changed);
        assert_eq!(report.avatars_added, 1);
        assert_eq!(report.mods_synced, 1);
        assert_eq!(report.ignored, vec![3]);
        assert_eq!(report.mods[0].kind, ContentKind::DancePackage);

        let avatars = r.store().load_avatars().unwrap();
        assert_eq!(avatars.len(), 1);
        assert_eq!(
            avatars[0].thumbnail_path,
            r.paths().thumbnail_for("a").to_string_lossy()
        );
        assert!(r.paths().thumbnail_for("a").exists());
        assert_eq!(r.store().load_mod_map().unwrap().get("d.me"), Some(2));
    }

    #[test]
    fn test_unchanged_category_is_not_written() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote");
        write_package(&remote.join("2").join("d.me"), &[("dance_meta.json", "{}")]);

        let r = reconciler(&temp.path().join("data"));
        let report = r.run(&snapshot(vec![item(&remote, 2)]), 1);

        assert!(!report.avatars_changed);
        assert!(!r.paths().avatars_store_path().exists());
        assert!(r.paths().mod_map_store_path().exists());
    }

    #[test]
    fn test_stale_item_is_recopied() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote");
        write_item(&remote.join("1"), &[("a.vrm", "v1")]);

        let r = reconciler(&temp.path().join("data"));
        r.run(&snapshot(vec![item(&remote, 1)]), 1);

        std::fs::write(remote.join("1").join("a.vrm"), "v2").unwrap();
        let unchanged = r.run(&snapshot(vec![item(&remote, 1)]), 2);
        assert!(!unchanged.avatars_changed);

        let mut stale = item(&remote, 1);
        stale.needs_update = true;
        let report = r.run(&snapshot(vec![stale]), 3);
        assert!(report.avatars_changed);
        assert_eq!(report.avatars_updated, 1);

        let mirrored = r.paths().avatars_dir().join("a.vrm");
        assert_eq!(std::fs::read_to_string(mirrored).unwrap(), "v2");
    }
}
