//! Workshop Mirror - Headless engine that mirrors remote workshop
//! subscriptions into local avatar and mod libraries.
//!
//! The engine compares the live subscription set of a remote content
//! platform with what is recorded locally, copies new and stale content into
//! managed folders, evicts content whose subscription is gone, and tells the
//! host's libraries when something changed. Passes run in the background,
//! one at a time; overlapping refresh requests coalesce.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use workshop_core::{DirectoryPlatform, WorkshopMirror};
//!
//! #[tokio::main]
//! async fn main() -> workshop_core::Result<()> {
//!     let platform = Arc::new(DirectoryPlatform::new("/srv/workshop"));
//!     let mirror = WorkshopMirror::builder("/data/mate", platform)
//!         .auto_create_dirs(true)
//!         .build()
//!         .await?;
//!
//!     mirror.refresh();
//!     mirror.wait_idle().await;
//!
//!     if let Some(report) = mirror.last_report() {
//!         println!("{} avatars added", report.avatars_added);
//!     }
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notifier;
pub mod reconcile;
pub mod remote;
pub mod store;

mod api;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use classify::{classify_item, Classification, ContentKind, ModType};
pub use config::{MirrorPaths, SyncSettings};
pub use coordinator::{RefreshCoordinator, RefreshRequest, RefreshStatus};
pub use error::{MirrorError, Result};
pub use notifier::{AvatarLibrary, ModLoader, Notifier};
pub use reconcile::{PassReport, Reconciler, SyncedMod};
pub use remote::{
    DirectoryPlatform, DynRemotePlatform, ItemState, RemoteItem, RemotePlatform, Snapshot,
};
pub use store::{AvatarEntry, LocalStore, ModMapping};

pub use api::WorkshopMirrorBuilder;

use std::path::PathBuf;

/// Main entry point of the engine.
///
/// Owns the coordinator and everything it drives. Cloning is not needed:
/// every method takes `&self`, and `refresh()` may be called from any
/// thread.
pub struct WorkshopMirror {
    paths: MirrorPaths,
    platform: DynRemotePlatform,
    store: LocalStore,
    coordinator: RefreshCoordinator,
}

impl WorkshopMirror {
    /// Start configuring a mirror rooted at `data_root`.
    pub fn builder(
        data_root: impl Into<PathBuf>,
        platform: DynRemotePlatform,
    ) -> WorkshopMirrorBuilder {
        WorkshopMirrorBuilder::new(data_root, platform)
    }

    /// Request a reconciliation pass.
    pub fn refresh(&self) -> RefreshRequest {
        self.coordinator.refresh()
    }

    pub fn status(&self) -> RefreshStatus {
        self.coordinator.status()
    }

    /// Wait until no pass is running or queued.
    pub async fn wait_idle(&self) {
        self.coordinator.wait_idle().await
    }

    /// Wait until listeners have been told about every finished pass.
    pub async fn wait_notified(&self) {
        self.coordinator.wait_notified().await
    }

    pub fn last_report(&self) -> Option<PassReport> {
        self.coordinator.last_report()
    }

    pub fn last_error(&self) -> Option<String> {
        self.coordinator.last_error()
    }

    pub fn had_changes_last_run(&self) -> bool {
        self.coordinator.had_changes_last_run()
    }

    pub fn completed_passes(&self) -> u64 {
        self.coordinator.completed_passes()
    }

    pub fn paths(&self) -> &MirrorPaths {
        &self.paths
    }
}

impl std::fmt::Debug for WorkshopMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkshopMirror")
            .field("paths", &self.paths)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
