// src/recipe/format.rs

//! Recipe data format
//!
//! Each recipe ships a TOML table of upstream sources and diff patches,
//! keyed by version:
//!
//! ```toml
//! [sources."9.1.0"]
//! url = "https://download.osgeo.org/proj/proj-%(version)s.tar.gz"
//! sha256 = "..."
//!
//! [[patches."9.1.0"]]
//! patch_file = "patches/9.1.0-0001-fix-install.patch"
//! patch_description = "fix install destination"
//! ```
//!
//! The table decides which versions a recipe can build.

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeData {
    /// Source archive per version
    #[serde(default)]
    pub sources: BTreeMap<String, SourceEntry>,

    /// Diff patches per version, applied in listed order
    #[serde(default)]
    pub patches: BTreeMap<String, Vec<PatchEntry>>,

    /// Directory relative patch files are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Archive location; `%(version)s` is substituted
    pub url: String,

    /// Expected SHA-256 of the archive (hex)
    #[serde(default)]
    pub sha256: Option<String>,

    /// Drop the single top-level directory most tarballs carry
    #[serde(default = "default_strip_root")]
    pub strip_root: bool,

    /// Subdirectory of the source root to unpack into
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Unified diff, relative to the recipe data file
    pub patch_file: String,

    /// Directory inside the source tree the diff applies to
    #[serde(default)]
    pub base_path: Option<String>,

    /// Leading path components to drop from diff file names (like `patch -p`)
    #[serde(default = "default_strip")]
    pub strip: u32,

    #[serde(default)]
    pub patch_description: Option<String>,
}

fn default_strip_root() -> bool {
    true
}

fn default_strip() -> u32 {
    1
}

impl RecipeData {
    /// Substitute `%(version)s` in a template
    pub fn substitute(template: &str, version: &str) -> String {
        template.replace("%(version)s", version)
    }

    /// Whether the data lists `version`
    pub fn has_version(&self, version: &Version) -> bool {
        self.source_key(version).is_some()
    }

    /// Listed versions, oldest first
    pub fn versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .sources
            .keys()
            .filter_map(|k| Version::parse(k).ok())
            .collect();
        versions.sort();
        versions
    }

    /// Source entry for a version
    pub fn source_for(&self, version: &Version) -> Result<&SourceEntry> {
        self.source_key(version)
            .and_then(|k| self.sources.get(k))
            .ok_or_else(|| Error::NotFound(format!("No source listed for version {}", version)))
    }

    /// Diff patches for a version, in application order
    pub fn patches_for(&self, version: &Version) -> &[PatchEntry] {
        self.patches
            .iter()
            .find(|(k, _)| Version::parse(k).is_ok_and(|v| v == *version))
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    /// Archive URL for a version with variables substituted
    pub fn archive_url(&self, version: &Version) -> Result<String> {
        let source = self.source_for(version)?;
        Ok(Self::substitute(&source.url, version.as_str()))
    }

    /// Archive file name from the URL
    pub fn archive_filename(&self, version: &Version) -> Result<String> {
        let url = self.archive_url(version)?;
        Ok(url
            .split('/')
            .next_back()
            .filter(|s| !s.is_empty())
            .unwrap_or("source.tar.gz")
            .to_string())
    }

    /// Location of a patch file on disk
    pub fn patch_path(&self, entry: &PatchEntry) -> PathBuf {
        let path = Path::new(&entry.patch_file);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn source_key(&self, version: &Version) -> Option<&str> {
        self.sources
            .keys()
            .find(|k| Version::parse(k).is_ok_and(|v| v == *version))
            .map(String::as_str)
    }
}
