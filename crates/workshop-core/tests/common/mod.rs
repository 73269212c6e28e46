//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use workshop_core::{
    AvatarEntry, AvatarLibrary, DirectoryPlatform, ModLoader, WorkshopMirror,
    WorkshopMirrorBuilder,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A data root and a folder-backed platform side by side.
pub struct TestEnv {
    pub temp: TempDir,
    pub platform: Arc<DirectoryPlatform>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let remote = temp.path().join("remote");
        fs::create_dir_all(&remote).unwrap();
        Self {
            platform: Arc::new(DirectoryPlatform::new(remote)),
            temp,
        }
    }

    pub fn data_root(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn remote_root(&self) -> PathBuf {
        self.temp.path().join("remote")
    }

    pub fn item_dir(&self, id: u64) -> PathBuf {
        self.remote_root().join(id.to_string())
    }

    /// Builder with short waits so timeouts resolve quickly.
    pub fn builder(&self) -> WorkshopMirrorBuilder {
        WorkshopMirror::builder(self.data_root(), self.platform.clone())
            .poll_interval(Duration::from_millis(20))
            .install_timeout(Duration::from_millis(200))
            .keep_backups(false)
    }

    pub async fn mirror(&self) -> WorkshopMirror {
        self.builder().build().await.unwrap()
    }

    /// Seed `avatars.json` before the mirror sees it.
    pub fn seed_avatars(&self, entries: &serde_json::Value) {
        fs::create_dir_all(self.data_root()).unwrap();
        fs::write(
            self.data_root().join("avatars.json"),
            serde_json::to_string_pretty(entries).unwrap(),
        )
        .unwrap();
    }

    pub fn avatars_json(&self) -> String {
        fs::read_to_string(self.data_root().join("avatars.json")).unwrap()
    }
}

/// Run one pass and wait for it.
pub async fn sync(mirror: &WorkshopMirror) {
    mirror.refresh();
    mirror.wait_idle().await;
}

pub fn write_item(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
}

pub fn write_package(path: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in entries {
        zip.start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn find_entry<'a>(entries: &'a [AvatarEntry], file_name: &str) -> Option<&'a AvatarEntry> {
    entries
        .iter()
        .find(|e| Path::new(&e.file_path).file_name().and_then(|n| n.to_str()) == Some(file_name))
}

/// Listener that counts how often it was told about changes.
#[derive(Default)]
pub struct CountingListener {
    pub reloads: AtomicUsize,
    pub rescans: AtomicUsize,
}

impl CountingListener {
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn rescans(&self) -> usize {
        self.rescans.load(Ordering::SeqCst)
    }
}

impl AvatarLibrary for CountingListener {
    fn reload_avatars(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

impl ModLoader for CountingListener {
    fn rescan_mods(&self) {
        self.rescans.fetch_add(1, Ordering::SeqCst);
    }
}
