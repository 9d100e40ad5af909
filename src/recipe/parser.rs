// src/recipe/parser.rs

//! Recipe data parsing

use crate::error::{Error, Result};
use crate::recipe::format::RecipeData;
use crate::version::Version;
use std::path::Path;

/// Parse recipe data from a TOML string
pub fn parse_recipe_data(content: &str) -> Result<RecipeData> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe data: {}", e)))
}

/// Parse recipe data from a file
///
/// Relative patch files are resolved against the file's directory.
pub fn parse_recipe_data_file(path: &Path) -> Result<RecipeData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read recipe data file: {}", e)))?;

    let mut data = parse_recipe_data(&content)?;
    data.base_dir = path.parent().map(Path::to_path_buf);
    Ok(data)
}

/// Validate recipe data for completeness and correctness
pub fn validate_recipe_data(data: &RecipeData) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if data.sources.is_empty() {
        return Err(Error::ParseError("Recipe data lists no sources".to_string()));
    }

    for (version, source) in &data.sources {
        Version::parse(version).map_err(|e| {
            Error::ParseError(format!("Invalid source version '{}': {}", version, e))
        })?;

        if source.url.trim().is_empty() {
            return Err(Error::ParseError(format!(
                "Source for {} has an empty url",
                version
            )));
        }

        match &source.sha256 {
            Some(sum) => {
                if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(Error::ParseError(format!(
                        "Invalid sha256 for {}: {}",
                        version, sum
                    )));
                }
            }
            None => {
                if source.url.starts_with("http://") || source.url.starts_with("https://") {
                    warnings.push(format!("Remote source for {} has no sha256", version));
                }
            }
        }
    }

    for (version, patches) in &data.patches {
        if !data.sources.contains_key(version) {
            warnings.push(format!("Patches listed for unknown version {}", version));
        }
        for patch in patches {
            if patch.patch_file.trim().is_empty() {
                return Err(Error::ParseError(format!(
                    "Patch for {} has an empty patch_file",
                    version
                )));
            }
            if patch.patch_description.is_none() {
                warnings.push(format!("Patch {} has no description", patch.patch_file));
            }
        }
    }

    Ok(warnings)
}
