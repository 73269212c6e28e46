//! Snapshot building with bounded install waits.

use crate::config::SyncSettings;
use crate::error::Result;
use crate::remote::{DynRemotePlatform, ItemState, RemoteItem, Snapshot};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Turns the live subscription set into a [`Snapshot`].
///
/// Each item gets at most `install_timeout` to show up on disk, checked every
/// `poll_interval`. Items that miss the deadline are left out of the snapshot
/// and picked up again on a later pass.
pub struct SnapshotBuilder {
    platform: DynRemotePlatform,
    poll_interval: Duration,
    install_timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(platform: DynRemotePlatform, settings: &SyncSettings) -> Self {
        Self {
            platform,
            poll_interval: settings.poll_interval,
            install_timeout: settings.install_timeout,
        }
    }

    /// Query the platform and wait for each subscribed item in turn.
    ///
    /// Fails only if the subscription list itself cannot be read; per-item
    /// problems just leave that item out.
    pub async fn build(&self) -> Result<Snapshot> {
        let ids = self.platform.subscribed_items().await?;
        debug!("Platform reports {} subscribed items", ids.len());

        let mut snapshot = Snapshot::default();
        for id in ids {
            if !snapshot.subscribed.insert(id) {
                continue;
            }

            match self.resolve_item(id).await {
                Some(item) => snapshot.items.push(item),
                None => warn!(
                    "Item {} not installed within {:?}, retrying next refresh",
                    id, self.install_timeout
                ),
            }

            tokio::task::yield_now().await;
        }

        info!(
            "Snapshot ready: {} of {} subscribed items installed",
            snapshot.items.len(),
            snapshot.subscribed.len()
        );
        Ok(snapshot)
    }

    async fn resolve_item(&self, id: u64) -> Option<RemoteItem> {
        let state = match self.platform.item_state(id).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to query state of item {}: {}", id, e);
                ItemState::default()
            }
        };

        if !state.installed || state.needs_update {
            match self.platform.request_download(id, true).await {
                Ok(true) => debug!("Requested download of item {}", id),
                Ok(false) => debug!("Platform declined download of item {}", id),
                Err(e) => warn!("Failed to request download of item {}: {}", id, e),
            }
        }

        let install_path = self.wait_for_install(id).await?;
        Some(RemoteItem {
            remote_id: id,
            install_path,
            needs_update: state.needs_update,
        })
    }

    async fn wait_for_install(&self, id: u64) -> Option<PathBuf> {
        let deadline = Instant::now() + self.install_timeout;
        loop {
            if let Some(path) = self.installed_path(id).await {
                return Some(path);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Install folder of `id` if it is usable right now.
    async fn installed_path(&self, id: u64) -> Option<PathBuf> {
        match self.platform.install_info(id).await {
            Ok(Some(path)) if !path.as_os_str().is_empty() && path.is_dir() => Some(path),
            Ok(_) => None,
            Err(e) => {
                debug!("Install info for item {} unavailable: {}", id, e);
                None
            }
        }
    }
}
