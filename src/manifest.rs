// src/manifest.rs

//! Package manifest (manifest.toml)
//!
//! Written into every finished package directory. It tells consumers what to
//! link, which headers to add, which upstream packages are needed and what
//! environment the package contributes at run and build time.

use crate::env::EnvOverlay;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest inside a package directory
pub const MANIFEST_FILE: &str = "manifest.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub package: PackageInfo,

    /// Settings the package was built for
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// Resolved options, rendered as strings
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Upstream packages consumers must also link (`name/version`)
    #[serde(default)]
    pub requires: Vec<String>,

    /// Tools needed while building, not at run time
    #[serde(default)]
    pub tool_requires: Vec<String>,

    #[serde(default)]
    pub cpp_info: CppInfo,

    /// Naming hints for consumer build systems (cmake_file_name, ...)
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Environment for running programs that use the package
    #[serde(default)]
    pub runenv: EnvOverlay,

    /// Environment for builds that use the package's tools
    #[serde(default)]
    pub buildenv: EnvOverlay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

/// Compile and link information for C/C++ consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CppInfo {
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub cxxflags: Vec<String>,
    /// Directories relative to the package root
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub res_dirs: Vec<String>,
    /// Components of upstream packages this library uses (`pkg::component`)
    pub requires: Vec<String>,
}

impl Default for CppInfo {
    fn default() -> Self {
        Self {
            libs: Vec::new(),
            system_libs: Vec::new(),
            defines: Vec::new(),
            cxxflags: Vec::new(),
            include_dirs: vec!["include".to_string()],
            lib_dirs: vec!["lib".to_string()],
            bin_dirs: vec!["bin".to_string()],
            res_dirs: vec!["res".to_string()],
            requires: Vec::new(),
        }
    }
}

impl PackageManifest {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            package: PackageInfo {
                name: name.to_string(),
                version: version.to_string(),
                ..PackageInfo::default()
            },
            settings: BTreeMap::new(),
            options: BTreeMap::new(),
            requires: Vec::new(),
            tool_requires: Vec::new(),
            cpp_info: CppInfo::default(),
            properties: BTreeMap::new(),
            runenv: EnvOverlay::new(),
            buildenv: EnvOverlay::new(),
        }
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_string(), value.into());
    }

    /// Parse manifest from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: PackageManifest = toml::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid manifest: {}", e)))?;
        if manifest.package.name.is_empty() {
            return Err(Error::ParseError("Manifest package.name is empty".to_string()));
        }
        Ok(manifest)
    }

    /// Load `manifest.toml` from a package directory
    pub fn load(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::PackagingError(format!("Failed to serialize manifest: {}", e)))
    }

    /// Write `manifest.toml` into a package directory
    pub fn write_to(&self, package_dir: &Path) -> Result<PathBuf> {
        let path = package_dir.join(MANIFEST_FILE);
        fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }
}

/// Library names found in `lib_dir`, as a linker would spell them
///
/// `libproj.a` and `libproj.so` become `proj`; `proj.lib` stays `proj`.
/// Versioned sonames (`libproj.so.25`) are skipped in favor of the
/// unversioned link. The result is sorted and deduplicated.
pub fn collect_libs(lib_dir: &Path) -> Result<Vec<String>> {
    if !lib_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut libs = Vec::new();
    for entry in fs::read_dir(lib_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        let Some((stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        let lib = match ext {
            "lib" => stem,
            "a" | "so" | "dylib" => stem.strip_prefix("lib").unwrap_or(stem),
            _ => continue,
        };
        if !lib.is_empty() {
            libs.push(lib.to_string());
        }
    }

    libs.sort();
    libs.dedup();
    Ok(libs)
}
