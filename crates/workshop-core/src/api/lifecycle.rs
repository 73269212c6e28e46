//! Reactions to host and platform subscription events.
//!
//! Every event ends in a plain [`WorkshopMirror::refresh`]; the coordinator
//! takes care of coalescing bursts of events into as few passes as possible.

use tracing::{debug, info, warn};

use crate::coordinator::RefreshRequest;
use crate::error::Result;
use crate::WorkshopMirror;

impl WorkshopMirror {
    /// The user subscribed to an item: ask for it right away, then sync.
    pub async fn on_item_subscribed(&self, remote_id: u64) -> RefreshRequest {
        info!("Subscribed to item {}", remote_id);
        match self.platform.request_download(remote_id, true).await {
            Ok(accepted) => debug!("Download of item {} accepted: {}", remote_id, accepted),
            Err(e) => warn!("Failed to request download of item {}: {}", remote_id, e),
        }
        self.refresh()
    }

    /// The user unsubscribed from an item outside the engine.
    pub fn on_item_unsubscribed(&self, remote_id: u64) -> RefreshRequest {
        info!("Unsubscribed from item {}", remote_id);
        self.refresh()
    }

    /// A platform download finished. Failed downloads change nothing on
    /// disk, so only successful ones trigger a pass.
    pub fn on_download_complete(&self, remote_id: u64, success: bool) -> Option<RefreshRequest> {
        if !success {
            warn!("Download of item {} failed", remote_id);
            return None;
        }
        debug!("Download of item {} complete", remote_id);
        Some(self.refresh())
    }

    /// Drop the subscription to an item and reconcile.
    pub async fn unsubscribe(&self, remote_id: u64) -> Result<RefreshRequest> {
        self.platform.unsubscribe(remote_id).await?;
        Ok(self.on_item_unsubscribed(remote_id))
    }
}
