//! Remote platform boundary and per-pass snapshots.
//!
//! The engine never talks to a content service directly. Everything it needs
//! from one goes through [`RemotePlatform`], and each pass freezes what it
//! learned into a [`Snapshot`].

mod directory;
mod snapshot;

pub use directory::DirectoryPlatform;
pub use snapshot::SnapshotBuilder;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Install state the platform reports for one subscribed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemState {
    pub installed: bool,
    pub needs_update: bool,
}

/// The subscription/content service the mirror follows.
///
/// Implementations wrap whatever client the host has. Calls may be slow;
/// none of them is made while holding engine state.
#[async_trait]
pub trait RemotePlatform: Send + Sync {
    /// Ids of every item the user is subscribed to, in platform order.
    async fn subscribed_items(&self) -> Result<Vec<u64>>;

    /// Current install state of an item.
    async fn item_state(&self, id: u64) -> Result<ItemState>;

    /// Install folder of an item, if the platform has one for it.
    async fn install_info(&self, id: u64) -> Result<Option<PathBuf>>;

    /// Ask the platform to (re)download an item. Returns whether the request
    /// was accepted.
    async fn request_download(&self, id: u64, high_priority: bool) -> Result<bool>;

    /// Drop the subscription to an item.
    async fn unsubscribe(&self, id: u64) -> Result<()>;
}

/// Shared handle to a platform implementation.
pub type DynRemotePlatform = Arc<dyn RemotePlatform>;

/// One subscribed item that is installed and usable this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub remote_id: u64,
    pub install_path: PathBuf,
    pub needs_update: bool,
}

/// Frozen view of the subscription set for one pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Installed items in platform order.
    pub items: Vec<RemoteItem>,
    /// Every subscribed id, including ones left out of `items`.
    pub subscribed: BTreeSet<u64>,
}

impl Snapshot {
    /// Subscribed ids that did not make it into `items`.
    pub fn skipped(&self) -> Vec<u64> {
        self.subscribed
            .iter()
            .copied()
            .filter(|id| !self.items.iter().any(|item| item.remote_id == *id))
            .collect()
    }

    pub fn is_subscribed(&self, id: u64) -> bool {
        self.subscribed.contains(&id)
    }
}
