//! Lightweight inspection of `.me` content packages.
//!
//! A package is a zip archive. Only entry names and a few small JSON
//! entries are read; payloads are never unpacked here.

use crate::config::ContentConfig;
use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use zip::ZipArchive;

/// Upper bound on how much of a JSON entry is read.
const MAX_JSON_ENTRY_BYTES: u64 = 1024 * 1024;

/// Mod category a package can declare in `mod_type.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModType {
    Mod,
    Sound,
    Particle,
    Animation,
    Misc,
}

impl ModType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModType::Mod => "mod",
            ModType::Sound => "sound",
            ModType::Particle => "particle",
            ModType::Animation => "animation",
            ModType::Misc => "misc",
        }
    }

    /// Parse a declared type, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mod" => Some(ModType::Mod),
            "sound" => Some(ModType::Sound),
            "particle" => Some(ModType::Particle),
            "animation" => Some(ModType::Animation),
            "misc" => Some(ModType::Misc),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a package's entry list and metadata entries say about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub has_dance_meta: bool,
    pub has_bundle: bool,
    pub has_thumbnail: bool,
    pub mod_type: Option<ModType>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub song_name: Option<String>,
}

impl PackageInfo {
    /// Dance packages carry dance metadata or a Unity asset bundle.
    pub fn is_dance(&self) -> bool {
        self.has_dance_meta || self.has_bundle
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DanceMeta {
    song_name: Option<String>,
    song_author: Option<String>,
    mmd_author: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModInfo {
    author: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModTypeDoc {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Inspect a package's entries.
///
/// Fails only if the archive cannot be opened; malformed metadata entries
/// are ignored.
pub fn inspect_package(path: &Path) -> Result<PackageInfo> {
    let file = File::open(path).map_err(|e| MirrorError::io_with_path(e, path))?;
    let mut archive = ZipArchive::new(file).map_err(|e| MirrorError::archive(e, path))?;

    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let find = |wanted: &str| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)).cloned();

    let mut info = PackageInfo {
        has_dance_meta: find(ContentConfig::DANCE_META_ENTRY).is_some(),
        has_bundle: names.iter().any(|n| {
            n.to_lowercase()
                .ends_with(ContentConfig::BUNDLE_ENTRY_SUFFIX)
        }),
        has_thumbnail: find(ContentConfig::PACKAGE_THUMB_ENTRY).is_some(),
        ..Default::default()
    };

    if let Some(name) = find(ContentConfig::MOD_TYPE_ENTRY) {
        let doc: Option<ModTypeDoc> = read_json_entry(&mut archive, &name);
        info.mod_type = doc.and_then(|d| d.kind).and_then(|k| ModType::parse(&k));
    }

    let mod_info: Option<ModInfo> = match find(ContentConfig::MOD_INFO_ENTRY) {
        Some(name) => read_json_entry(&mut archive, &name),
        None => None,
    };
    let dance: Option<DanceMeta> = match find(ContentConfig::DANCE_META_ENTRY) {
        Some(name) => read_json_entry(&mut archive, &name),
        None => None,
    };

    let mod_info = mod_info.unwrap_or_default();
    let dance = dance.unwrap_or_default();
    info.description = non_blank(mod_info.description);
    info.song_name = non_blank(dance.song_name);
    info.author = [mod_info.author, dance.song_author, dance.mmd_author]
        .into_iter()
        .find_map(known_author);

    Ok(info)
}

/// Copy one entry of a package to `dest`, matching the name case-insensitively.
///
/// Returns `Ok(false)` if the package has no such entry.
pub fn extract_entry(package: &Path, entry_name: &str, dest: &Path) -> Result<bool> {
    let file = File::open(package).map_err(|e| MirrorError::io_with_path(e, package))?;
    let mut archive = ZipArchive::new(file).map_err(|e| MirrorError::archive(e, package))?;

    let Some(name) = archive
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(entry_name))
        .map(String::from)
    else {
        return Ok(false);
    };

    let mut entry = archive
        .by_name(&name)
        .map_err(|e| MirrorError::archive(e, package))?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;
    }
    let mut out = File::create(dest).map_err(|e| MirrorError::io_with_path(e, dest))?;
    io::copy(&mut entry, &mut out).map_err(|e| MirrorError::io_with_path(e, dest))?;
    Ok(true)
}

fn read_json_entry<T: serde::de::DeserializeOwned>(
    archive: &mut ZipArchive<File>,
    name: &str,
) -> Option<T> {
    let entry = archive.by_name(name).ok()?;
    let mut text = String::new();
    entry
        .take(MAX_JSON_ENTRY_BYTES)
        .read_to_string(&mut text)
        .ok()?;
    serde_json::from_str(text.trim_start_matches('\u{feff}')).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Authors of "Unknown" are placeholders left by the upload tool.
fn known_author(value: Option<String>) -> Option<String> {
    non_blank(value).filter(|a| {
        !a.eq_ignore_ascii_case("unknown") && !a.eq_ignore_ascii_case("author: unknown")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_package;
    use tempfile::TempDir;

    #[test]
    fn test_dance_meta_marks_dance_package() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dance.me");
        write_package(
            &path,
            &[(
                "Dance_Meta.json",
                r#"{"songName":"Song","songAuthor":" ","mmdAuthor":"Motion"}"#,
            )],
        );

        let info = inspect_package(&path).unwrap();
        assert!(info.is_dance());
        assert_eq!(info.song_name.as_deref(), Some("Song"));
        assert_eq!(info.author.as_deref(), Some("Motion"));
    }

    #[test]
    fn test_bundle_entry_marks_dance_package() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dance.me");
        write_package(&path, &[("clips/moves.BUNDLE", "x")]);

        assert!(inspect_package(&path).unwrap().is_dance());
    }

    #[test]
    fn test_mod_type_and_info() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fx.me");
        write_package(
            &path,
            &[
                ("mod_type.json", r#"{"type":" Particle "}"#),
                (
                    "modinfo.json",
                    r#"{"author":"Unknown","description":"Sparkles"}"#,
                ),
                ("thumb.png", "PNG"),
            ],
        );

        let info = inspect_package(&path).unwrap();
        assert!(!info.is_dance());
        assert_eq!(info.mod_type, Some(ModType::Particle));
        assert_eq!(info.description.as_deref(), Some("Sparkles"));
        assert_eq!(info.author, None);
        assert!(info.has_thumbnail);
    }

    #[test]
    fn test_unknown_mod_type_is_ignored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.me");
        write_package(&path, &[("mod_type.json", r#"{"type":"shader"}"#)]);

        assert_eq!(inspect_package(&path).unwrap().mod_type, None);
    }

    #[test]
    fn test_malformed_metadata_is_ignored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.me");
        write_package(&path, &[("modinfo.json", "{ broken")]);

        let info = inspect_package(&path).unwrap();
        assert_eq!(info, PackageInfo::default());
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.me");
        std::fs::write(&path, b"plain text").unwrap();

        assert!(matches!(
            inspect_package(&path),
            Err(MirrorError::Archive { .. })
        ));
    }

    #[test]
    fn test_extract_entry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.me");
        write_package(&path, &[("THUMB.png", "image")]);

        let dest = temp.path().join("out").join("x_thumb.png");
        assert!(extract_entry(&path, "thumb.png", &dest).unwrap());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "image");

        let missing = temp.path().join("none.png");
        assert!(!extract_entry(&path, "nothing.json", &missing).unwrap());
        assert!(!missing.exists());
    }
}
