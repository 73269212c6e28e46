//! Centralized configuration for the workshop mirror.
//!
//! Constant holders for timing, directory layout and content rules, plus the
//! runtime path layout ([`MirrorPaths`]) and tunables ([`SyncSettings`]) the
//! builder hands to each component.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Timing and IO parameters for a reconciliation pass.
pub struct SyncConfig;

impl SyncConfig {
    /// How often an item's install state is re-checked while waiting.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// How long a single item may take to become installed.
    pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const COPY_BUFFER_SIZE: usize = 128 * 1024;
}

/// Directory and file names under the data and cache roots.
pub struct PathsConfig;

impl PathsConfig {
    pub const AVATARS_DIR_NAME: &'static str = "Steam Workshop";
    pub const MODS_DIR_NAME: &'static str = "Mods";
    pub const THUMBNAILS_DIR_NAME: &'static str = "Thumbnails";
    pub const MOD_CACHE_DIR_NAME: &'static str = "ME_Cache";
    pub const CACHE_DIR_NAME: &'static str = "cache";
    pub const AVATARS_FILENAME: &'static str = "avatars.json";
    pub const MOD_MAP_FILENAME: &'static str = "mods_workshop_map.json";
}

/// Content classification rules.
pub struct ContentConfig;

impl ContentConfig {
    /// Extensions (lowercase, no dot) an item may ship as its payload.
    pub const ALLOWED_EXTENSIONS: &'static [&'static str] = &["vrm", "me", "unity3d"];
    pub const MODEL_EXTENSION: &'static str = "vrm";
    pub const PACKAGE_EXTENSION: &'static str = "me";
    pub const LEGACY_BUNDLE_EXTENSION: &'static str = "unity3d";

    /// Sidecar metadata file next to an installed avatar.
    pub const SIDECAR_FILENAME: &'static str = "metadata.json";
    pub const THUMBNAIL_SUFFIX: &'static str = "_thumb.png";

    // Entries inside a `.me` package
    pub const DANCE_META_ENTRY: &'static str = "dance_meta.json";
    pub const MOD_TYPE_ENTRY: &'static str = "mod_type.json";
    pub const MOD_INFO_ENTRY: &'static str = "modinfo.json";
    pub const PACKAGE_THUMB_ENTRY: &'static str = "thumb.png";
    pub const BUNDLE_ENTRY_SUFFIX: &'static str = ".bundle";

    // Defaults for missing avatar metadata
    pub const DEFAULT_AUTHOR: &'static str = "Workshop";
    pub const DEFAULT_VERSION: &'static str = "1.0";
    pub const MODEL_FILE_TYPE: &'static str = "VRM";
    pub const PACKAGE_FILE_TYPE: &'static str = ".ME";
}

/// Runtime tunables for the snapshot builder and store.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub install_timeout: Duration,
    /// Keep a `.bak` copy of each store document before overwriting it.
    pub keep_backups: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: SyncConfig::POLL_INTERVAL,
            install_timeout: SyncConfig::INSTALL_TIMEOUT,
            keep_backups: true,
        }
    }
}

/// Resolved on-disk layout of the mirror.
///
/// All paths are absolute and lexically normalized so containment checks
/// compare like with like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPaths {
    data_root: PathBuf,
    cache_root: PathBuf,
}

impl MirrorPaths {
    /// Layout rooted at `data_root`, with the mod-loader cache under
    /// `data_root/cache`.
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        let data_root = normalize_path(data_root.as_ref());
        let cache_root = data_root.join(PathsConfig::CACHE_DIR_NAME);
        Self {
            data_root,
            cache_root,
        }
    }

    /// Override where the downstream mod loader keeps its cache.
    pub fn with_cache_root(mut self, cache_root: impl AsRef<Path>) -> Self {
        self.cache_root = normalize_path(cache_root.as_ref());
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Managed mirror of synced avatar files.
    pub fn avatars_dir(&self) -> PathBuf {
        self.data_root.join(PathsConfig::AVATARS_DIR_NAME)
    }

    /// Managed mirror of synced mod files.
    pub fn mods_dir(&self) -> PathBuf {
        self.data_root.join(PathsConfig::MODS_DIR_NAME)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.data_root.join(PathsConfig::THUMBNAILS_DIR_NAME)
    }

    /// Cache folder the mod loader derives from a mod file.
    pub fn mod_cache_dir(&self, mod_stem: &str) -> PathBuf {
        self.cache_root
            .join(PathsConfig::MOD_CACHE_DIR_NAME)
            .join(mod_stem)
    }

    /// Thumbnail path for a content file's base name.
    pub fn thumbnail_for(&self, stem: &str) -> PathBuf {
        self.thumbnails_dir()
            .join(format!("{}{}", stem, ContentConfig::THUMBNAIL_SUFFIX))
    }

    pub fn avatars_store_path(&self) -> PathBuf {
        self.data_root.join(PathsConfig::AVATARS_FILENAME)
    }

    pub fn mod_map_store_path(&self) -> PathBuf {
        self.data_root.join(PathsConfig::MOD_MAP_FILENAME)
    }

    /// Every directory the engine owns, in creation order.
    pub fn managed_dirs(&self) -> [PathBuf; 3] {
        [self.avatars_dir(), self.mods_dir(), self.thumbnails_dir()]
    }

    /// Whether `path` lies inside the managed avatars mirror.
    pub fn is_managed_avatar(&self, path: &Path) -> bool {
        is_within(path, &self.avatars_dir())
    }

    /// Whether `path` lies inside the managed thumbnails directory.
    pub fn is_managed_thumbnail(&self, path: &Path) -> bool {
        is_within(path, &self.thumbnails_dir())
    }
}

/// Component-wise containment check on normalized paths.
///
/// `/data/Mods2/x` is not inside `/data/Mods`, unlike a string prefix test.
pub fn is_within(path: &Path, dir: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    let path = normalize_path(path);
    let dir = normalize_path(dir);
    path != dir && path.starts_with(&dir)
}

/// Make a path absolute and resolve `.` and `..` without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(SyncConfig::INSTALL_TIMEOUT > SyncConfig::POLL_INTERVAL);
        assert_eq!(SyncConfig::POLL_INTERVAL, Duration::from_millis(100));
        assert_eq!(SyncConfig::INSTALL_TIMEOUT, Duration::from_secs(10));
    }

    #[test]
    fn test_layout_under_data_root() {
        let paths = MirrorPaths::new("/data/mate");
        assert_eq!(paths.avatars_dir(), PathBuf::from("/data/mate/Steam Workshop"));
        assert_eq!(paths.mods_dir(), PathBuf::from("/data/mate/Mods"));
        assert_eq!(
            paths.thumbnail_for("dance"),
            PathBuf::from("/data/mate/Thumbnails/dance_thumb.png")
        );
        assert_eq!(
            paths.mod_cache_dir("dance"),
            PathBuf::from("/data/mate/cache/ME_Cache/dance")
        );
    }

    #[test]
    fn test_cache_root_override() {
        let paths = MirrorPaths::new("/data/mate").with_cache_root("/tmp/mate");
        assert_eq!(
            paths.mod_cache_dir("x"),
            PathBuf::from("/tmp/mate/ME_Cache/x")
        );
    }

    #[test]
    fn test_is_within_is_component_wise() {
        let dir = Path::new("/data/Mods");
        assert!(is_within(Path::new("/data/Mods/a.me"), dir));
        assert!(is_within(Path::new("/data/other/../Mods/a.me"), dir));
        assert!(!is_within(Path::new("/data/Mods2/a.me"), dir));
        assert!(!is_within(Path::new("/data/Mods/../a.me"), dir));
        assert!(!is_within(Path::new("/data/Mods"), dir));
        assert!(!is_within(Path::new(""), dir));
    }
}
