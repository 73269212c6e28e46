//! Read access to the persisted libraries.

use crate::error::Result;
use crate::store::{AvatarEntry, ModMapping};
use crate::WorkshopMirror;

impl WorkshopMirror {
    /// Avatar entries as last persisted.
    ///
    /// Reads the store document directly; after a change notification this
    /// reflects the pass that sent it.
    pub fn list_avatars(&self) -> Result<Vec<AvatarEntry>> {
        self.store.load_avatars()
    }

    /// Avatar entries that are currently owned by a subscription.
    pub fn list_synced_avatars(&self) -> Result<Vec<AvatarEntry>> {
        Ok(self
            .list_avatars()?
            .into_iter()
            .filter(AvatarEntry::is_synced)
            .collect())
    }

    /// Mod file name to remote id mapping as last persisted.
    pub fn mod_mappings(&self) -> Result<ModMapping> {
        self.store.load_mod_map()
    }
}
