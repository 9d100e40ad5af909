// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Recipe name, version and target selection shared by configure and cook
fn build_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("recipe").required(true).help("Recipe name (see `stockpot list`)"))
        .arg(
            Arg::new("version")
                .long("version")
                .value_name("VERSION")
                .required(true)
                .help("Upstream version to build"),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("FILE")
                .help("Profile with settings, options, toolchain and dependency paths"),
        )
        .arg(
            Arg::new("setting")
                .short('s')
                .long("setting")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Override a setting (e.g. -s os=Linux -s compiler.version=9)"),
        )
        .arg(
            Arg::new("option")
                .short('o')
                .long("option")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Override an option (e.g. -o shared=True)"),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .value_name("FILE")
                .help("Recipe data file replacing the built-in sources and patches"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Parallel build jobs (default: available CPUs)"),
        )
        .arg(
            Arg::new("max_ram_gb")
                .long("max-ram-gb")
                .value_name("GB")
                .env("STOCKPOT_BUILD_MAX_RAM_GB")
                .help("Memory available to the build, in GB"),
        )
}

fn source_cache_arg() -> Arg {
    Arg::new("source_cache")
        .long("source-cache")
        .value_name("DIR")
        .help("Source cache directory")
}

fn build_cli() -> Command {
    Command::new("stockpot")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Stockpot Contributors")
        .about("Recipe-driven builds and packaging for third-party native libraries")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
        .subcommand(Command::new("list").about("List recipes and their known versions"))
        .subcommand(
            Command::new("options")
                .about("Show the options a recipe declares")
                .arg(Arg::new("recipe").required(true).help("Recipe name")),
        )
        .subcommand(
            build_args(Command::new("configure").about("Resolve a recipe and print what a cook would do"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the plan as JSON"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch and cache source archives without building")
                .arg(Arg::new("recipe").required(true).help("Recipe name"))
                .arg(
                    Arg::new("version")
                        .long("version")
                        .value_name("VERSION")
                        .required(true)
                        .help("Upstream version to fetch"),
                )
                .arg(Arg::new("data").long("data").value_name("FILE").help("Recipe data file"))
                .arg(source_cache_arg()),
        )
        .subcommand(
            build_args(Command::new("cook").about("Build a package from a recipe"))
                .arg(
                    Arg::new("output_dir")
                        .short('O')
                        .long("output-dir")
                        .default_value(".")
                        .help("Directory receiving <name>-<version>/"),
                )
                .arg(source_cache_arg())
                .arg(
                    Arg::new("work_dir")
                        .long("work-dir")
                        .value_name("DIR")
                        .help("Parent directory for temporary work trees"),
                )
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep the work directory after the cook (for debugging)"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(Arg::new("shell").required(true).help("Shell type")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("stockpot.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
