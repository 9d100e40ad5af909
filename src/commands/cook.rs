// src/commands/cook.rs
//! Cook command - build packages from recipes

use super::{kitchen_config, resolve};
use crate::cli::BuildArgs;
use anyhow::{Context, Result};
use stockpot::cookbook;
use stockpot::{Kitchen, KitchenConfig, Version};
use std::path::Path;
use tracing::info;

/// Cook a package from a built-in recipe
///
/// # Arguments
/// * `args` - Recipe, version, profile and overrides
/// * `output_dir` - Directory receiving the package directory
/// * `source_cache` - Directory for caching downloaded sources
/// * `work_dir` - Parent of the temporary work tree
/// * `keep_builddir` - Keep the work tree after completion
pub fn cmd_cook(
    args: &BuildArgs,
    output_dir: &Path,
    source_cache: Option<&Path>,
    work_dir: Option<&Path>,
    keep_builddir: bool,
) -> Result<()> {
    let resolved = resolve(args)?;
    let recipe = resolved.recipe.as_ref();

    let mut config = kitchen_config(args, &resolved.profile, source_cache);
    config.keep_builddir = keep_builddir;
    config.work_root = work_dir.map(Path::to_path_buf);
    let kitchen = Kitchen::new(config);

    println!("Recipe: {} version {}", args.recipe, resolved.ctx.version());
    if kitchen.source_cached(recipe, resolved.ctx.version()) {
        println!("  - Sources already cached");
    }

    let result = kitchen
        .cook(recipe, &resolved.ctx, output_dir)
        .with_context(|| format!("Failed to cook {} {}", args.recipe, args.version))?;

    println!("Cooking used {} parallel job(s)", result.jobs);
    println!(
        "Patches: {} applied, {} skipped, {} tolerated",
        result.patches.applied.len(),
        result.patches.skipped.len(),
        result.patches.tolerated.len()
    );
    println!("\n[COMPLETE] Cooked: {}", result.package_dir.display());

    if !result.warnings.is_empty() {
        println!("\nBuild warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
    if let Some(dir) = &result.build_dir {
        println!("Work directory kept at {}", dir.display());
    }

    info!(
        "Successfully cooked {} to {}",
        args.recipe,
        result.package_dir.display()
    );
    Ok(())
}

/// Fetch sources only
pub fn cmd_fetch(
    name: &str,
    version: &str,
    data: Option<&Path>,
    source_cache: Option<&Path>,
) -> Result<()> {
    let recipe = cookbook::find_with_data(name, data)
        .with_context(|| format!("Failed to load recipe '{}'", name))?;
    let version = Version::parse(version)?;

    let mut config = KitchenConfig::default();
    if let Some(cache) = source_cache {
        config.source_cache = cache.to_path_buf();
    }
    let kitchen = Kitchen::new(config);

    println!("Fetching sources for {} {}...", name, version);
    let path = kitchen
        .fetch(recipe.as_ref(), &version)
        .with_context(|| format!("Failed to fetch sources for {} {}", name, version))?;

    println!("\n[COMPLETE] Fetched: {}", path.display());
    Ok(())
}
