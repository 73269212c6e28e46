//! Content classification for installed items.
//!
//! An item folder is reduced to one payload file, chosen by extension, and a
//! [`ContentKind`] that decides which library the file belongs to.

mod metadata;
mod package;

pub use metadata::{read_avatar_metadata, AvatarMetadata};
pub use package::{extract_entry, inspect_package, ModType, PackageInfo};

use crate::config::ContentConfig;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What an installed payload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "modType", rename_all = "camelCase")]
pub enum ContentKind {
    /// A bare `.vrm` model.
    AvatarModel,
    /// A `.me` package with no dance or mod markers.
    AvatarPackage,
    DancePackage,
    GenericMod(ModType),
    /// A `.unity3d` bundle from older uploads.
    LegacyBundle,
}

impl ContentKind {
    pub fn is_avatar(&self) -> bool {
        matches!(self, ContentKind::AvatarModel | ContentKind::AvatarPackage)
    }

    pub fn is_mod(&self) -> bool {
        !self.is_avatar()
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::AvatarModel => write!(f, "avatar model"),
            ContentKind::AvatarPackage => write!(f, "avatar package"),
            ContentKind::DancePackage => write!(f, "dance package"),
            ContentKind::GenericMod(tag) => write!(f, "{} mod", tag),
            ContentKind::LegacyBundle => write!(f, "legacy bundle"),
        }
    }
}

/// Result of classifying one install folder.
#[derive(Debug, Clone)]
pub struct Classification {
    pub kind: ContentKind,
    /// The payload file inside the install folder.
    pub file: PathBuf,
    /// Package inspection results, for readable `.me` payloads.
    pub package: Option<PackageInfo>,
    /// Sidecar metadata, for avatars only.
    pub metadata: Option<AvatarMetadata>,
}

impl Classification {
    pub fn file_name(&self) -> Option<&str> {
        self.file.file_name().and_then(|n| n.to_str())
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.file.file_stem().and_then(|n| n.to_str())
    }

    /// Whether the payload carries an embedded thumbnail.
    pub fn has_embedded_thumbnail(&self) -> bool {
        self.package.as_ref().is_some_and(|p| p.has_thumbnail)
    }
}

/// Classify the payload of an install folder.
///
/// Returns `None` if the folder holds no file with an allowed extension.
pub fn classify_item(install_dir: &Path) -> Option<Classification> {
    let file = select_payload(install_dir)?;
    let extension = extension_of(&file)?;

    let (kind, package) = match extension.as_str() {
        ContentConfig::MODEL_EXTENSION => (ContentKind::AvatarModel, None),
        ContentConfig::LEGACY_BUNDLE_EXTENSION => (ContentKind::LegacyBundle, None),
        _ => match inspect_package(&file) {
            Ok(info) => (package_kind(&info), Some(info)),
            Err(e) => {
                warn!("Treating unreadable package as avatar: {}", e);
                (ContentKind::AvatarPackage, None)
            }
        },
    };

    let metadata = kind
        .is_avatar()
        .then(|| read_avatar_metadata(&file, kind == ContentKind::AvatarPackage));

    debug!("Classified {} as {}", file.display(), kind);
    Some(Classification {
        kind,
        file,
        package,
        metadata,
    })
}

/// First top-level file, by name, whose extension is allowed.
pub fn select_payload(install_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(install_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            extension_of(path)
                .is_some_and(|ext| ContentConfig::ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        })
}

fn package_kind(info: &PackageInfo) -> ContentKind {
    if info.is_dance() {
        ContentKind::DancePackage
    } else if let Some(tag) = info.mod_type {
        ContentKind::GenericMod(tag)
    } else {
        ContentKind::AvatarPackage
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
