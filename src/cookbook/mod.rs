// src/cookbook/mod.rs

//! Built-in recipes

mod proj;
mod v8;

pub use proj::ProjRecipe;
pub use v8::{V8Recipe, check_python_version};

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::recipe::{BuildContext, Recipe, RecipeData, parse_recipe_data_file, validate_recipe_data};
use std::path::Path;
use tracing::warn;

/// Names of the built-in recipes
pub const RECIPES: &[&str] = &["proj", "v8"];

/// Every built-in recipe with its embedded data
pub fn all() -> Result<Vec<Box<dyn Recipe>>> {
    RECIPES.iter().map(|name| find(name)).collect()
}

/// Look up a built-in recipe by name
pub fn find(name: &str) -> Result<Box<dyn Recipe>> {
    find_with_data(name, None)
}

/// Look up a recipe, replacing its embedded data with a file when given
pub fn find_with_data(name: &str, data_file: Option<&Path>) -> Result<Box<dyn Recipe>> {
    let data = match data_file {
        Some(path) => {
            let data = parse_recipe_data_file(path)?;
            for warning in validate_recipe_data(&data)? {
                warn!("{}: {}", path.display(), warning);
            }
            Some(data)
        }
        None => None,
    };

    let recipe: Box<dyn Recipe> = match name {
        "proj" => Box::new(match data {
            Some(data) => ProjRecipe::with_data(data),
            None => ProjRecipe::new()?,
        }),
        "v8" => Box::new(match data {
            Some(data) => V8Recipe::with_data(data),
            None => V8Recipe::new()?,
        }),
        _ => {
            return Err(Error::NotFound(format!(
                "Unknown recipe '{}' (available: {})",
                name,
                RECIPES.join(", ")
            )));
        }
    };
    Ok(recipe)
}

fn embedded(name: &str, content: &str) -> Result<RecipeData> {
    crate::recipe::parse_recipe_data(content)
        .map_err(|e| Error::ParseError(format!("Embedded data for {}: {}", name, e)))
}

/// Manifest pre-filled with package metadata, settings and options
fn base_manifest(recipe: &dyn Recipe, ctx: &BuildContext) -> PackageManifest {
    let info = recipe.info();
    let mut manifest = PackageManifest::new(info.name, ctx.version().as_str());
    manifest.package.description = info.description.to_string();
    manifest.package.license = Some(info.license.to_string());
    manifest.package.homepage = Some(info.homepage.to_string());
    manifest.settings = ctx.settings().as_map();
    manifest.options = ctx
        .config
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    manifest.requires = recipe.requires(ctx);
    manifest.tool_requires = recipe.tool_requires(ctx);
    manifest
}
