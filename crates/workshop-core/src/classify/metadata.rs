//! Sidecar metadata for installed avatars.

use crate::config::ContentConfig;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Display metadata for one avatar, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarMetadata {
    pub display_name: String,
    pub author: String,
    pub version: String,
    pub file_type: String,
    pub polygon_count: i32,
    pub is_nsfw: bool,
}

impl AvatarMetadata {
    /// Defaults used when an avatar ships no metadata.
    pub fn defaults_for(file: &Path, is_package: bool) -> Self {
        let display_name = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = if is_package {
            ContentConfig::PACKAGE_FILE_TYPE
        } else {
            ContentConfig::MODEL_FILE_TYPE
        };

        Self {
            display_name,
            author: ContentConfig::DEFAULT_AUTHOR.to_string(),
            version: ContentConfig::DEFAULT_VERSION.to_string(),
            file_type: file_type.to_string(),
            polygon_count: 0,
            is_nsfw: false,
        }
    }

    fn apply(&mut self, doc: &Map<String, Value>) {
        if let Some(v) = doc.get("displayName").and_then(text) {
            self.display_name = v;
        }
        if let Some(v) = doc.get("author").and_then(text) {
            self.author = v;
        }
        if let Some(v) = doc.get("version").and_then(text) {
            self.version = v;
        }
        if let Some(v) = doc.get("fileType").and_then(text) {
            self.file_type = v;
        }
        if let Some(v) = doc.get("polygonCount").and_then(integer) {
            self.polygon_count = v;
        }
        if let Some(v) = doc.get("isNSFW").and_then(flag) {
            self.is_nsfw = v;
        }
    }
}

/// Metadata for the avatar at `file`, merged over the defaults from the
/// `metadata.json` next to it.
///
/// A missing or unreadable sidecar yields the defaults.
pub fn read_avatar_metadata(file: &Path, is_package: bool) -> AvatarMetadata {
    let mut meta = AvatarMetadata::defaults_for(file, is_package);
    let Some(dir) = file.parent() else {
        return meta;
    };

    let sidecar = dir.join(ContentConfig::SIDECAR_FILENAME);
    let text = match std::fs::read_to_string(&sidecar) {
        Ok(text) => text,
        Err(_) => return meta,
    };
    match serde_json::from_str::<Value>(text.trim_start_matches('\u{feff}')) {
        Ok(Value::Object(doc)) => meta.apply(&doc),
        Ok(_) => debug!("Ignoring non-object sidecar {}", sidecar.display()),
        Err(e) => debug!("Ignoring malformed sidecar {}: {}", sidecar.display(), e),
    }
    meta
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}
