//! Persisted record types.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One avatar in the host's avatar library document.
///
/// Field names match the host application's `avatars.json`. Fields the
/// engine does not know about are carried in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub polygon_count: i32,
    #[serde(rename = "isNSFW", deserialize_with = "null_as_default")]
    pub is_nsfw: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_steam_workshop: bool,
    /// Remote item id, 0 when the avatar did not come from a subscription.
    #[serde(
        rename = "steamFileId",
        alias = "remoteId",
        deserialize_with = "null_as_default"
    )]
    pub remote_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_owner: bool,
    /// Host-owned fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AvatarEntry {
    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }

    /// Whether this entry is currently owned by a remote subscription.
    pub fn is_synced(&self) -> bool {
        self.is_steam_workshop && self.remote_id != 0
    }
}

/// Mod file name (inside the managed mods directory) → remote item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ModMapping {
    entries: BTreeMap<String, u64>,
}

impl ModMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<u64> {
        self.entries.get(file_name).copied()
    }

    /// Record `file_name → remote_id`. Returns true if the row is new or its
    /// id changed.
    pub fn record(&mut self, file_name: impl Into<String>, remote_id: u64) -> bool {
        self.entries.insert(file_name.into(), remote_id) != Some(remote_id)
    }

    pub fn remove(&mut self, file_name: &str) -> Option<u64> {
        self.entries.remove(file_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, u64)> for ModMapping {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
