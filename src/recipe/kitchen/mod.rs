// src/recipe/kitchen/mod.rs

//! Kitchen: where recipes are cooked
//!
//! The Kitchen checks a resolved recipe against the host, fetches and
//! caches its source, and drives a [`Cook`] through the phases:
//!
//! 1. **Prep**: fetch the source archive (cached by checksum)
//! 2. **Unpack/Patch**: extract into a fresh work directory, apply patches
//! 3. **Simmer**: run the generator and build tool
//! 4. **Plate**: stage artifacts, promote the package, write the manifest

mod archive;
mod config;
mod cook;
mod prep;

pub use config::{CookResult, KitchenConfig};
pub use prep::{
    PatchAction, PatchOp, PatchPolicy, PatchReport, apply_patches, apply_unified_diff,
};

use archive::{download_file, verify_file_checksum};
use cook::Cook;

use crate::env::EnvOverlay;
use crate::error::{Error, Result};
use crate::generator::GeneratorArgs;
use crate::jobs::constrained_jobs;
use crate::recipe::{BuildContext, Layout, Recipe};
use crate::version::Version;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
}

/// What a cook would do, computed without touching the file system
#[derive(Debug, Clone, Serialize)]
pub struct CookPlan {
    pub recipe: String,
    pub version: String,
    pub settings: std::collections::BTreeMap<String, String>,
    pub options: crate::options::BuildConfiguration,
    pub requires: Vec<String>,
    pub tool_requires: Vec<String>,
    pub tools: Vec<String>,
    pub generator_args: GeneratorArgs,
    pub environment: EnvOverlay,
    pub patches: Vec<PlannedPatch>,
    pub steps: Vec<String>,
    pub jobs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedPatch {
    pub description: String,
    pub applies: bool,
    pub best_effort: bool,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration
    pub fn new(config: KitchenConfig) -> Self {
        Self { config }
    }

    /// Create a Kitchen with default configuration
    pub fn with_defaults() -> Self {
        Self::new(KitchenConfig::default())
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Verify the host can build the recipe
    ///
    /// Every tool the recipe names must resolve on PATH, and the recipe's
    /// own system checks must pass. Runs before any fetch.
    pub fn check_requirements(&self, recipe: &dyn Recipe, ctx: &BuildContext) -> Result<()> {
        if self.config.check_tools {
            let missing: Vec<String> = recipe
                .tools(ctx)
                .into_iter()
                .filter(|tool| which::which(tool).is_err())
                .collect();
            if !missing.is_empty() {
                return Err(Error::ConfigurationError(format!(
                    "Required tools not found on PATH: {}",
                    missing.join(", ")
                )));
            }
        }
        recipe.check_system(ctx)
    }

    /// Parallel jobs for this recipe under the configured memory ceiling
    pub fn jobs_for(&self, recipe: &dyn Recipe, ctx: &BuildContext) -> Result<u32> {
        constrained_jobs(
            self.config.jobs,
            self.config.max_ram_gb,
            recipe.memory_per_job_gb(ctx),
        )
    }

    /// Describe a cook without performing it
    pub fn plan(&self, recipe: &dyn Recipe, ctx: &BuildContext) -> Result<CookPlan> {
        let info = recipe.info();
        let layout = Layout::under(Path::new("<work>"), Path::new("<package>"));
        let jobs = self.jobs_for(recipe, ctx)?;
        let generator_args = recipe.generator_args(ctx, &layout)?;

        let mut patches: Vec<PlannedPatch> = recipe
            .data()
            .patches_for(ctx.version())
            .iter()
            .map(|p| PlannedPatch {
                description: p
                    .patch_description
                    .clone()
                    .unwrap_or_else(|| p.patch_file.clone()),
                applies: true,
                best_effort: false,
            })
            .collect();
        for op in recipe.patches(ctx, &layout)? {
            patches.push(PlannedPatch {
                applies: op.applies(&ctx.target, &ctx.config),
                best_effort: op.policy == PatchPolicy::BestEffort,
                description: op.description,
            });
        }

        let steps = recipe
            .build_steps(ctx, &layout, &generator_args, jobs)
            .into_iter()
            .chain(recipe.package_steps(ctx, &layout))
            .map(|s| s.to_string())
            .collect();

        Ok(CookPlan {
            recipe: info.name.to_string(),
            version: ctx.version().to_string(),
            settings: ctx.settings().as_map(),
            options: ctx.config.clone(),
            requires: recipe.requires(ctx),
            tool_requires: recipe.tool_requires(ctx),
            tools: recipe.tools(ctx),
            environment: recipe.environment(ctx, &layout),
            generator_args,
            patches,
            steps,
            jobs,
        })
    }

    /// Cook a resolved recipe into `<output_dir>/<name>-<version>`
    ///
    /// Requirement checks and the job computation run first, so an
    /// unsupported host or a bad memory ceiling fails before anything is
    /// fetched or created, the output directory included. On any
    /// later failure the partially staged package is removed.
    pub fn cook(&self, recipe: &dyn Recipe, ctx: &BuildContext, output_dir: &Path) -> Result<CookResult> {
        let info = recipe.info();
        info!("Cooking {} version {}", info.name, ctx.version());

        self.check_requirements(recipe, ctx)?;
        let jobs = self.jobs_for(recipe, ctx)?;

        fs::create_dir_all(output_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;
        let mut cook = Cook::new(self, recipe, ctx, output_dir, jobs)?;

        let outcome = run_phases(&mut cook);

        match outcome {
            Ok(manifest) => Ok(cook.finish(manifest)),
            Err(e) => {
                cook.discard();
                Err(e)
            }
        }
    }

    /// Fetch sources for a recipe version without building
    ///
    /// Returns the cached archive path.
    pub fn fetch(&self, recipe: &dyn Recipe, version: &Version) -> Result<PathBuf> {
        let data = recipe.data();
        let source = data.source_for(version).map_err(|_| {
            Error::ConfigurationError(format!(
                "{} {} is not available",
                recipe.info().name,
                version
            ))
        })?;
        let url = data.archive_url(version)?;
        let filename = data.archive_filename(version)?;
        info!("Fetching: {}", url);
        self.fetch_source(&url, source.sha256.as_deref(), &filename)
    }

    /// Check if the source for a recipe version is already cached
    pub fn source_cached(&self, recipe: &dyn Recipe, version: &Version) -> bool {
        let data = recipe.data();
        let (Ok(source), Ok(filename)) = (data.source_for(version), data.archive_filename(version))
        else {
            return false;
        };
        self.config
            .source_cache
            .join(cache_key(source.sha256.as_deref(), &filename))
            .exists()
    }

    /// Fetch a source archive (with caching)
    ///
    /// Archives with a checksum are cached under it and re-verified on
    /// reuse. Remote archives without one are cached by file name; local
    /// ones are always copied afresh.
    pub(crate) fn fetch_source(&self, url: &str, sha256: Option<&str>, filename: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.source_cache)?;

        let key = cache_key(sha256, filename);
        let cached_path = self.config.source_cache.join(&key);
        let remote = url.starts_with("http://") || url.starts_with("https://");

        if cached_path.exists() && (sha256.is_some() || remote) {
            debug!("Using cached source: {}", cached_path.display());
            match sha256 {
                Some(expected) => match verify_file_checksum(&cached_path, expected) {
                    Ok(()) => return Ok(cached_path),
                    Err(Error::ChecksumMismatch { .. }) => {
                        warn!("Cached file checksum mismatch, re-downloading");
                        fs::remove_file(&cached_path)?;
                    }
                    Err(e) => return Err(e),
                },
                None => return Ok(cached_path),
            }
        }

        info!("Downloading: {}", url);
        let temp_path = self.config.source_cache.join(format!("{}.tmp", key));
        if let Err(e) = download_file(url, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Some(expected) = sha256
            && let Err(e) = verify_file_checksum(&temp_path, expected)
        {
            fs::remove_file(&temp_path)?;
            return Err(e);
        }

        fs::rename(&temp_path, &cached_path)?;
        Ok(cached_path)
    }
}

fn run_phases(cook: &mut Cook<'_>) -> Result<crate::manifest::PackageManifest> {
    // Phase 1: Prep - fetch ingredients
    info!("Prep: fetching ingredients...");
    cook.prep()?;

    // Phase 2: Unpack and patch
    info!("Unpacking and patching sources...");
    cook.unpack()?;
    cook.patch()?;

    // Phase 3: Simmer - run the build
    info!("Simmering: running build...");
    cook.simmer()?;

    // Phase 4: Plate - package the result
    info!("Plating: staging package...");
    cook.plate()
}

fn cache_key(sha256: Option<&str>, filename: &str) -> String {
    match sha256 {
        Some(sum) => format!("sha256_{}_{}", sum.to_ascii_lowercase(), filename),
        None => filename.to_string(),
    }
}
