// src/recipe/mod.rs

//! Recipes for building third-party native libraries
//!
//! A recipe declares options and platform rules, names the tools it needs,
//! and turns a resolved configuration into patch operations, generator
//! arguments, build steps and a package manifest. The [`Kitchen`] runs
//! those pieces in order.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build specification (like a recipe card)
//! - **Cook**: Build a package from a recipe
//! - **Kitchen**: Runs cooks and keeps the source cache
//! - **Prep**: Fetch, unpack and patch sources
//! - **Simmer**: Run the generator and build tool
//! - **Plate**: Stage artifacts and write the manifest

mod format;
mod kitchen;
pub mod parser;
mod step;

pub use format::{PatchEntry, RecipeData, SourceEntry};
pub use kitchen::{
    CookPlan, CookResult, Kitchen, KitchenConfig, PatchAction, PatchOp, PatchPolicy, PatchReport,
    PlannedPatch, apply_patches, apply_unified_diff,
};
pub use parser::{parse_recipe_data, parse_recipe_data_file, validate_recipe_data};
pub use step::{CopyRule, Invocation, Step};

use crate::env::EnvOverlay;
use crate::error::{Error, Result};
use crate::generator::GeneratorArgs;
use crate::manifest::PackageManifest;
use crate::options::{self, BuildConfiguration, OptionDecl, Rule};
use crate::profile::{DependencyInfo, Profile, ToolchainSection};
use crate::settings::{Settings, Target};
use crate::version::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub license: &'static str,
    pub homepage: &'static str,
}

/// Everything a recipe may consult once options are resolved
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub target: Target,
    pub config: BuildConfiguration,
    pub toolchain: ToolchainSection,
    pub dependencies: BTreeMap<String, DependencyInfo>,
}

impl BuildContext {
    pub fn settings(&self) -> &Settings {
        &self.target.settings
    }

    pub fn version(&self) -> &Version {
        &self.target.version
    }

    /// Truthiness of an option; removed options read as false
    pub fn option(&self, name: &str) -> bool {
        self.config.get_bool(name)
    }
}

/// Directories of one cook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Root of the unpacked source
    pub source_dir: PathBuf,
    /// Out-of-tree build directory
    pub build_dir: PathBuf,
    /// Staging directory that becomes the package
    pub package_dir: PathBuf,
}

impl Layout {
    /// Conventional layout under a work directory
    pub fn under(work_dir: &Path, package_dir: &Path) -> Self {
        Self {
            source_dir: work_dir.join("src"),
            build_dir: work_dir.join("build"),
            package_dir: package_dir.to_path_buf(),
        }
    }
}

/// A buildable recipe
pub trait Recipe {
    fn info(&self) -> RecipeInfo;

    /// Sources and diff patches per version
    fn data(&self) -> &RecipeData;

    fn options(&self) -> Vec<OptionDecl>;

    /// Platform rules, evaluated in order after overrides are applied
    fn rules(&self) -> Result<Vec<Rule>>;

    /// Upstream packages consumers need (`name/version`)
    fn requires(&self, _ctx: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    /// Packages needed only to build
    fn tool_requires(&self, _ctx: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    /// Executables that must be on PATH before fetching
    fn tools(&self, _ctx: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    /// Checks against the host beyond tool presence
    fn check_system(&self, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// Source modifications, applied after any diff patches from the data
    fn patches(&self, ctx: &BuildContext, layout: &Layout) -> Result<Vec<PatchOp>>;

    /// Environment overlay for every spawned tool
    fn environment(&self, _ctx: &BuildContext, _layout: &Layout) -> EnvOverlay {
        EnvOverlay::new()
    }

    fn generator_args(&self, ctx: &BuildContext, layout: &Layout) -> Result<GeneratorArgs>;

    /// Estimated memory per compile job, in gigabytes
    fn memory_per_job_gb(&self, _ctx: &BuildContext) -> Option<f64> {
        None
    }

    /// Generator and build tool invocations
    fn build_steps(
        &self,
        ctx: &BuildContext,
        layout: &Layout,
        args: &GeneratorArgs,
        jobs: u32,
    ) -> Vec<Step>;

    /// Steps that populate `layout.package_dir`
    fn package_steps(&self, ctx: &BuildContext, layout: &Layout) -> Vec<Step>;

    /// Glob patterns, relative to the package directory, that must match
    /// at least one file after packaging
    fn required_artifacts(&self, _ctx: &BuildContext) -> Vec<String> {
        Vec::new()
    }

    /// Manifest for a finished package at `package_dir`
    fn package_info(&self, ctx: &BuildContext, package_dir: &Path) -> Result<PackageManifest>;
}

/// Resolve a recipe for a version and profile
///
/// Fails with a configuration error for a version the recipe data does not
/// list, an incomplete profile, or an option combination the recipe rejects.
/// Touches no file system state.
pub fn configure(recipe: &dyn Recipe, version: &str, profile: &Profile) -> Result<BuildContext> {
    let info = recipe.info();
    let version = Version::parse(version)
        .map_err(|e| Error::ConfigurationError(format!("Invalid version '{}': {}", version, e)))?;

    if !recipe.data().has_version(&version) {
        let known: Vec<String> = recipe.data().versions().iter().map(|v| v.to_string()).collect();
        return Err(Error::ConfigurationError(format!(
            "{} {} is not available (known versions: {})",
            info.name,
            version,
            known.join(", ")
        )));
    }

    let settings = profile.to_settings()?;
    let target = Target::new(settings, version);
    let overrides = profile.options_for(info.name);

    let config = options::resolve(&recipe.options(), &recipe.rules()?, &target, &overrides)?;
    debug!("Resolved options for {}: {:?}", info.name, config);

    Ok(BuildContext {
        target,
        config,
        toolchain: profile.toolchain.clone(),
        dependencies: profile.dependencies.clone(),
    })
}
