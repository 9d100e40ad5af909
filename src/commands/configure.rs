// src/commands/configure.rs
//! Configure command - resolve a recipe and show the cook plan

use super::{kitchen_config, resolve};
use crate::cli::BuildArgs;
use anyhow::{Context, Result};
use stockpot::Kitchen;

/// Resolve options and print what a cook would do
///
/// Nothing is fetched, created or spawned.
pub fn cmd_configure(args: &BuildArgs, json: bool) -> Result<()> {
    let resolved = resolve(args)?;
    let kitchen = Kitchen::new(kitchen_config(args, &resolved.profile, None));
    let plan = kitchen
        .plan(resolved.recipe.as_ref(), &resolved.ctx)
        .with_context(|| format!("Failed to plan {} {}", args.recipe, args.version))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Recipe: {} version {}", plan.recipe, plan.version);

    println!("\nSettings:");
    for (key, value) in &plan.settings {
        println!("  {} = {}", key, value);
    }

    println!("\nOptions:");
    for (name, value) in plan.options.iter() {
        println!("  {} = {}", name, value);
    }

    if !plan.requires.is_empty() {
        println!("\nRequires: {}", plan.requires.join(", "));
    }
    if !plan.tool_requires.is_empty() {
        println!("Tool requires: {}", plan.tool_requires.join(", "));
    }
    if !plan.tools.is_empty() {
        println!("Tools on PATH: {}", plan.tools.join(", "));
    }

    println!("\nGenerator arguments:");
    for arg in &plan.generator_args {
        println!("  {}", arg);
    }

    if !plan.environment.is_empty() {
        println!("\nBuild environment:");
        for op in plan.environment.ops() {
            println!("  {}", serde_json::to_string(op)?);
        }
    }

    println!("\nPatches:");
    for patch in &plan.patches {
        let marker = match (patch.applies, patch.best_effort) {
            (false, _) => "[SKIP]",
            (true, true) => "[TRY] ",
            (true, false) => "[OK]  ",
        };
        println!("  {} {}", marker, patch.description);
    }

    println!("\nSteps:");
    for step in &plan.steps {
        println!("  {}", step);
    }

    println!("\nParallel jobs: {}", plan.jobs);
    Ok(())
}
