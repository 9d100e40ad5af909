// src/cli.rs
//! CLI definitions for stockpot
//!
//! The command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stockpot")]
#[command(author = "Stockpot Contributors")]
#[command(version)]
#[command(about = "Recipe-driven builds and packaging for third-party native libraries", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Recipe, version and target selection shared by configure and cook
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Recipe name (see `stockpot list`)
    pub recipe: String,

    /// Upstream version to build
    #[arg(long = "version", value_name = "VERSION")]
    pub version: String,

    /// Profile with settings, options, toolchain and dependency paths
    #[arg(short, long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Override a setting (e.g. -s os=Linux -s compiler.version=9)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Override an option (e.g. -o shared=True or -o proj:with_curl=False)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Recipe data file replacing the built-in sources and patches
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Parallel build jobs (default: available CPUs)
    #[arg(short, long)]
    pub jobs: Option<u32>,

    /// Memory available to the build, in GB
    #[arg(long, env = "STOCKPOT_BUILD_MAX_RAM_GB", value_name = "GB")]
    pub max_ram_gb: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List recipes and their known versions
    List,

    /// Show the options a recipe declares
    Options {
        /// Recipe name
        recipe: String,
    },

    /// Resolve a recipe and print what a cook would do
    Configure {
        #[command(flatten)]
        build: BuildArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and cache source archives without building
    Fetch {
        /// Recipe name
        recipe: String,

        /// Upstream version to fetch
        #[arg(long = "version", value_name = "VERSION")]
        version: String,

        /// Recipe data file replacing the built-in sources
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// Source cache directory
        #[arg(long, value_name = "DIR")]
        source_cache: Option<PathBuf>,
    },

    /// Build a package from a recipe
    Cook {
        #[command(flatten)]
        build: BuildArgs,

        /// Directory receiving `<name>-<version>/`
        #[arg(short = 'O', long, default_value = ".")]
        output_dir: PathBuf,

        /// Source cache directory
        #[arg(long, value_name = "DIR")]
        source_cache: Option<PathBuf>,

        /// Parent directory for temporary work trees
        #[arg(long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        /// Keep the work directory after the cook (for debugging)
        #[arg(long)]
        keep_builddir: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}
