// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error [{}]: {:#}", failure_category(&err), err);
        std::process::exit(1);
    }
}

/// Category of the library error behind a command failure
fn failure_category(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<stockpot::Error>())
        .map_or("internal", stockpot::Error::category)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List => commands::cmd_list(),

        Commands::Options { recipe } => commands::cmd_options(&recipe),

        Commands::Configure { build, json } => commands::cmd_configure(&build, json),

        Commands::Fetch {
            recipe,
            version,
            data,
            source_cache,
        } => commands::cmd_fetch(&recipe, &version, data.as_deref(), source_cache.as_deref()),

        Commands::Cook {
            build,
            output_dir,
            source_cache,
            work_dir,
            keep_builddir,
        } => commands::cmd_cook(
            &build,
            &output_dir,
            source_cache.as_deref(),
            work_dir.as_deref(),
            keep_builddir,
        ),

        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "stockpot",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
