//! Builder for configuring WorkshopMirror initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::{MirrorPaths, SyncSettings};
use crate::coordinator::RefreshCoordinator;
use crate::error::{MirrorError, Result};
use crate::notifier::{AvatarLibrary, ModLoader, Notifier};
use crate::reconcile::Reconciler;
use crate::remote::{DynRemotePlatform, SnapshotBuilder};
use crate::store::LocalStore;
use crate::WorkshopMirror;

/// Builder for configuring WorkshopMirror initialization.
///
/// # Example
///
/// ```rust,ignore
/// use workshop_core::WorkshopMirror;
///
/// let mirror = WorkshopMirror::builder("/data/mate", platform)
///     .cache_root("/tmp/mate-cache")
///     .install_timeout(Duration::from_secs(30))
///     .avatar_library(library)
///     .build()
///     .await?;
/// ```
pub struct WorkshopMirrorBuilder {
    data_root: PathBuf,
    cache_root: Option<PathBuf>,
    platform: DynRemotePlatform,
    settings: SyncSettings,
    auto_create_dirs: bool,
    notifier: Notifier,
}

impl WorkshopMirrorBuilder {
    /// Create a new builder with the data root and remote platform.
    pub fn new(data_root: impl Into<PathBuf>, platform: DynRemotePlatform) -> Self {
        Self {
            data_root: data_root.into(),
            cache_root: None,
            platform,
            settings: SyncSettings::default(),
            auto_create_dirs: true,
            notifier: Notifier::new(),
        }
    }

    /// Where the downstream mod loader keeps its per-mod caches.
    ///
    /// Default: `<data_root>/cache`
    pub fn cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(cache_root.into());
        self
    }

    /// Default: 100 ms
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    /// How long one item may take to become installed before it is skipped
    /// for the current pass.
    ///
    /// Default: 10 s
    pub fn install_timeout(mut self, timeout: Duration) -> Self {
        self.settings.install_timeout = timeout;
        self
    }

    /// Keep `.bak` copies of the store documents.
    ///
    /// Default: `true`
    pub fn keep_backups(mut self, enable: bool) -> Self {
        self.settings.keep_backups = enable;
        self
    }

    /// Create the data root and managed folders if they don't exist.
    ///
    /// When disabled, the data root must already exist.
    ///
    /// Default: `true`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Register a library to reload when avatars change.
    pub fn avatar_library(mut self, library: Arc<dyn AvatarLibrary>) -> Self {
        self.notifier.add_avatar_library(library);
        self
    }

    /// Register a loader to rescan when mods change.
    pub fn mod_loader(mut self, loader: Arc<dyn ModLoader>) -> Self {
        self.notifier.add_mod_loader(loader);
        self
    }

    fn create_directory_structure(paths: &MirrorPaths) -> Result<()> {
        for dir in paths.managed_dirs() {
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| MirrorError::Io {
                    message: format!("Failed to create directory: {}", dir.display()),
                    path: Some(dir.clone()),
                    source: Some(e),
                })?;
                debug!("Created {}", dir.display());
            }
        }
        Ok(())
    }

    fn check_data_root(data_root: &Path) -> Result<()> {
        if !data_root.exists() {
            return Err(MirrorError::Config {
                message: format!("Data root does not exist: {}", data_root.display()),
            });
        }
        if !data_root.is_dir() {
            return Err(MirrorError::NotADirectory(data_root.to_path_buf()));
        }
        Ok(())
    }

    /// Build the WorkshopMirror instance.
    ///
    /// Passes are spawned onto the runtime this is awaited on.
    pub async fn build(self) -> Result<WorkshopMirror> {
        let handle = Handle::try_current().map_err(|e| MirrorError::Config {
            message: format!("No tokio runtime available: {}", e),
        })?;

        let mut paths = MirrorPaths::new(&self.data_root);
        if let Some(cache_root) = &self.cache_root {
            paths = paths.with_cache_root(cache_root);
        }

        if self.auto_create_dirs {
            Self::create_directory_structure(&paths)?;
        }
        Self::check_data_root(paths.data_root())?;

        let store = LocalStore::new(&paths, self.settings.keep_backups);
        let snapshots = SnapshotBuilder::new(self.platform.clone(), &self.settings);
        let reconciler = Reconciler::new(paths.clone(), store.clone());
        let listeners = self.notifier.listener_count();
        let coordinator = RefreshCoordinator::new(handle, snapshots, reconciler, self.notifier);

        info!(
            "Workshop mirror ready at {} ({} listeners)",
            paths.data_root().display(),
            listeners
        );

        Ok(WorkshopMirror {
            paths,
            platform: self.platform,
            store,
            coordinator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::DirectoryPlatform;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_creates_managed_dirs() {
        let temp = TempDir::new().unwrap();
        let data_root = temp.path().join("data");
        let platform = Arc::new(DirectoryPlatform::new(temp.path().join("remote")));

        let mirror = WorkshopMirror::builder(&data_root, platform)
            .cache_root(temp.path().join("cache"))
            .build()
            .await
            .unwrap();

        for dir in mirror.paths().managed_dirs() {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        assert_eq!(
            mirror.paths().mod_cache_dir("x"),
            temp.path().join("cache").join("ME_Cache").join("x")
        );
    }

    #[tokio::test]
    async fn test_missing_root_without_auto_create() {
        let temp = TempDir::new().unwrap();
        let platform = Arc::new(DirectoryPlatform::new(temp.path()));

        let result = WorkshopMirror::builder(temp.path().join("nope"), platform)
            .auto_create_dirs(false)
            .build()
            .await;
        assert!(matches!(result, Err(MirrorError::Config { .. })));
    }

    #[tokio::test]
    async fn test_file_as_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        std::fs::write(&file, "x").unwrap();
        let platform = Arc::new(DirectoryPlatform::new(temp.path()));

        let result = WorkshopMirror::builder(&file, platform)
            .auto_create_dirs(false)
            .build()
            .await;
        assert!(matches!(result, Err(MirrorError::NotADirectory(_))));
    }
}
