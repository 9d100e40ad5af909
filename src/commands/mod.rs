// src/commands/mod.rs
//! Command handlers for the stockpot CLI

mod configure;
mod cook;
mod list;

pub use configure::cmd_configure;
pub use cook::{cmd_cook, cmd_fetch};
pub use list::{cmd_list, cmd_options};

use crate::cli::BuildArgs;
use anyhow::{Context, Result};
use stockpot::cookbook;
use stockpot::{BuildContext, KitchenConfig, Profile, Recipe, configure};
use std::path::Path;

/// Recipe, resolved context and the profile it came from
pub(crate) struct Resolved {
    pub recipe: Box<dyn Recipe>,
    pub ctx: BuildContext,
    pub profile: Profile,
}

/// Load the profile, apply command-line overrides and resolve the recipe
pub(crate) fn resolve(args: &BuildArgs) -> Result<Resolved> {
    let recipe = cookbook::find_with_data(&args.recipe, args.data.as_deref())
        .with_context(|| format!("Failed to load recipe '{}'", args.recipe))?;

    let mut profile = match &args.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => Profile::default(),
    };
    for setting in &args.settings {
        profile.set_setting(setting)?;
    }
    for option in &args.options {
        profile.set_option(option)?;
    }

    let ctx = configure(recipe.as_ref(), &args.version, &profile)
        .with_context(|| format!("Cannot configure {} {}", args.recipe, args.version))?;

    Ok(Resolved {
        recipe,
        ctx,
        profile,
    })
}

/// Kitchen configuration: defaults, then the profile, then flags
pub(crate) fn kitchen_config(
    args: &BuildArgs,
    profile: &Profile,
    source_cache: Option<&Path>,
) -> KitchenConfig {
    let mut config = KitchenConfig::default();
    if let Some(cache) = source_cache {
        config.source_cache = cache.to_path_buf();
    }
    if let Some(jobs) = args.jobs.or(profile.build.jobs) {
        config.jobs = jobs;
    }
    config.max_ram_gb = args.max_ram_gb.or(profile.build.max_ram_gb);
    config
}
