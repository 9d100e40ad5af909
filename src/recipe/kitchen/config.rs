// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use crate::generator::GeneratorArgs;
use crate::manifest::PackageManifest;
use crate::recipe::kitchen::prep::PatchReport;
use std::path::PathBuf;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Directory for downloaded sources
    pub source_cache: PathBuf,
    /// Number of parallel jobs requested (before the memory ceiling)
    pub jobs: u32,
    /// Memory available to the build, in gigabytes
    pub max_ram_gb: Option<f64>,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
    /// Parent of temporary work directories (system temp dir when unset)
    pub work_root: Option<PathBuf>,
    /// Verify required tools are on PATH before fetching
    pub check_tools: bool,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        let source_cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("stockpot")
            .join("sources");

        Self {
            source_cache,
            jobs,
            max_ram_gb: None,
            keep_builddir: false,
            work_root: None,
            check_tools: true,
        }
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    /// Final package directory (`<output>/<name>-<version>`)
    pub package_dir: PathBuf,
    /// Manifest written into the package
    pub manifest: PackageManifest,
    /// Arguments handed to the generator
    pub generator_args: GeneratorArgs,
    /// Outcome of each patch operation
    pub patches: PatchReport,
    /// Parallel jobs used
    pub jobs: u32,
    /// Build log
    pub log: String,
    /// Warnings generated during build
    pub warnings: Vec<String>,
    /// Work directory, when kept
    pub build_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitchen_config_default() {
        let config = KitchenConfig::default();
        assert!(config.jobs > 0);
        assert!(config.max_ram_gb.is_none());
        assert!(!config.keep_builddir);
        assert!(config.check_tools);
        assert!(config.source_cache.ends_with("stockpot/sources"));
    }
}
