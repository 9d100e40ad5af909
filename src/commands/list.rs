// src/commands/list.rs
//! List recipes and their options

use anyhow::{Context, Result};
use stockpot::cookbook;

/// Print every recipe with its known versions
pub fn cmd_list() -> Result<()> {
    for recipe in cookbook::all()? {
        let info = recipe.info();
        let versions: Vec<String> = recipe
            .data()
            .versions()
            .iter()
            .rev()
            .map(|v| v.to_string())
            .collect();
        println!("{} - {}", info.name, info.description);
        println!("  Versions: {}", versions.join(", "));
    }
    Ok(())
}

/// Print the options a recipe declares
pub fn cmd_options(name: &str) -> Result<()> {
    let recipe = cookbook::find(name).with_context(|| format!("Failed to load recipe '{}'", name))?;

    println!("Options for {}:", recipe.info().name);
    for decl in recipe.options() {
        println!(
            "  {:<24} default: {:<8} values: {}",
            decl.name,
            decl.default.to_string(),
            decl.legal_values().join(", ")
        );
    }
    Ok(())
}
