// src/profile.rs

//! Build profiles
//!
//! A profile is a TOML file describing the target platform, option
//! overrides, the compilers to use and the location of already-built
//! dependencies:
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! compiler = "gcc"
//! "compiler.version" = "9"
//! build_type = "Release"
//!
//! [options]
//! shared = true
//! "proj:with_curl" = "False"
//!
//! [toolchain]
//! cc = "gcc-9"
//! cxx = "g++-9"
//!
//! [dependencies.sqlite3]
//! lib_dirs = ["/opt/sqlite3/lib"]
//!
//! [build]
//! jobs = 8
//! max_ram_gb = 16
//! ```
//!
//! Command-line `-s`/`-o` values are layered on top with
//! [`Profile::set_setting`] and [`Profile::set_option`].

use crate::error::{Error, Result};
use crate::settings::Settings;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Target settings (`os`, `arch`, `compiler`, `compiler.version`, ...)
    pub settings: BTreeMap<String, String>,
    /// Settings of the build machine, when cross-building
    pub settings_build: BTreeMap<String, String>,
    /// Option overrides, bare (`shared`) or recipe-scoped (`proj:shared`)
    #[serde(deserialize_with = "option_values")]
    pub options: BTreeMap<String, String>,
    pub toolchain: ToolchainSection,
    pub dependencies: BTreeMap<String, DependencyInfo>,
    pub build: BuildSection,
}

/// An option value as written in TOML; bare booleans and numbers are allowed
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

impl From<OptionValue> for String {
    fn from(value: OptionValue) -> Self {
        match value {
            OptionValue::Text(s) => s,
            OptionValue::Flag(true) => "True".to_string(),
            OptionValue::Flag(false) => "False".to_string(),
            OptionValue::Integer(n) => n.to_string(),
            OptionValue::Float(f) => f.to_string(),
        }
    }
}

fn option_values<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, OptionValue>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

/// Compiler executables handed to recipes that wire them in explicitly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    pub cc: String,
    pub cxx: String,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            cc: "cc".to_string(),
            cxx: "c++".to_string(),
        }
    }
}

/// Where a prebuilt dependency lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyInfo {
    pub lib_dirs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub jobs: Option<u32>,
    pub max_ram_gb: Option<f64>,
}

impl Profile {
    /// Parse a profile from TOML
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid profile: {}", e)))
    }

    /// Load a profile file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read profile {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Apply a `key=value` setting
    pub fn set_setting(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = split_assignment(assignment)?;
        self.settings.insert(key, value);
        Ok(())
    }

    /// Apply a `key=value` or `recipe:key=value` option override
    pub fn set_option(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = split_assignment(assignment)?;
        self.options.insert(key, value);
        Ok(())
    }

    /// Option overrides that apply to `recipe`
    ///
    /// Bare keys apply to every recipe; `recipe:key` entries only to the
    /// named recipe and win over a bare key of the same name.
    pub fn options_for(&self, recipe: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.options {
            if !key.contains(':') {
                out.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &self.options {
            if let Some((scope, name)) = key.split_once(':')
                && scope == recipe
            {
                out.insert(name.to_string(), value.clone());
            }
        }
        out
    }

    /// Typed target settings
    pub fn to_settings(&self) -> Result<Settings> {
        Settings::from_map(&self.settings, &self.settings_build)
    }
}

fn split_assignment(assignment: &str) -> Result<(String, String)> {
    let (key, value) = assignment.split_once('=').ok_or_else(|| {
        Error::ConfigurationError(format!("Expected key=value, got '{}'", assignment))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::ConfigurationError(format!(
            "Missing key in '{}'",
            assignment
        )));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
