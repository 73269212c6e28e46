//! Stand-in listeners for running without a host application.

use std::path::{Path, PathBuf};
use tracing::info;
use workshop_core::{AvatarLibrary, ModLoader};

/// Logs change notifications instead of reloading anything.
pub struct LoggingListener {
    data_root: PathBuf,
}

impl LoggingListener {
    pub fn new(data_root: &Path) -> Self {
        Self {
            data_root: data_root.to_path_buf(),
        }
    }
}

impl AvatarLibrary for LoggingListener {
    fn reload_avatars(&self) {
        info!(
            "Avatar library changed: {}",
            self.data_root.join("avatars.json").display()
        );
    }
}

impl ModLoader for LoggingListener {
    fn rescan_mods(&self) {
        info!("Mod set changed: {}", self.data_root.join("Mods").display());
    }
}
