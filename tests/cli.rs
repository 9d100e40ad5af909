// tests/cli.rs

//! CLI smoke tests for stockpot.

mod common;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn stockpot() -> Command {
    let mut cmd = cargo_bin_cmd!("stockpot");
    cmd.env_remove("RUST_LOG")
        .env_remove("STOCKPOT_BUILD_MAX_RAM_GB");
    cmd
}

const LINUX_GCC: &[&str] = &[
    "-s",
    "os=Linux",
    "-s",
    "arch=x86_64",
    "-s",
    "compiler=gcc",
    "-s",
    "compiler.version=9",
    "-s",
    "build_type=Release",
];

#[test]
fn test_help() {
    stockpot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cook"))
        .stdout(predicate::str::contains("configure"));
}

#[test]
fn test_list() {
    stockpot()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("proj"))
        .stdout(predicate::str::contains("9.1.0"))
        .stdout(predicate::str::contains("11.6.189.19"));
}

#[test]
fn test_options() {
    stockpot()
        .args(["options", "proj"])
        .assert()
        .success()
        .stdout(predicate::str::contains("with_curl"))
        .stdout(predicate::str::contains("build_executables"));
}

#[test]
fn test_options_unknown_recipe() {
    stockpot()
        .args(["options", "zlib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown recipe"));
}

#[test]
fn test_configure_json() {
    let output = stockpot()
        .args(["configure", "proj", "--version", "9.1.0", "--json", "-o", "with_curl=False"])
        .args(LINUX_GCC)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["recipe"], "proj");
    assert_eq!(plan["version"], "9.1.0");
    assert_eq!(plan["settings"]["compiler"], "gcc");

    let args = plan["generator_args"].as_array().unwrap();
    let value_of = |key: &str| {
        args.iter()
            .rev()
            .find(|a| a["key"] == key)
            .map(|a| a["value"].as_str().unwrap().to_string())
    };
    assert_eq!(value_of("ENABLE_CURL").as_deref(), Some("OFF"));
    assert_eq!(value_of("BUILD_PROJSYNC").as_deref(), Some("OFF"));
    assert_eq!(value_of("CMAKE_BUILD_TYPE").as_deref(), Some("Release"));
}

#[test]
fn test_configure_text() {
    stockpot()
        .args(["configure", "v8", "--version", "11.6.189.19"])
        .args(LINUX_GCC)
        .assert()
        .success()
        .stdout(predicate::str::contains("v8_monolithic = true"))
        .stdout(predicate::str::contains("Parallel jobs"));
}

#[test]
fn test_configure_rejects_unsupported_compiler() {
    stockpot()
        .args([
            "configure", "v8", "--version", "11.6.189.19", "-s", "os=Linux", "-s", "arch=x86_64",
            "-s", "compiler=gcc", "-s", "compiler.version=12",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [configuration]"))
        .stderr(predicate::str::contains("gcc 9"));
}

#[test]
fn test_configure_rejects_zero_ram_ceiling() {
    stockpot()
        .args(["configure", "v8", "--version", "11.6.189.19"])
        .args(LINUX_GCC)
        .env("STOCKPOT_BUILD_MAX_RAM_GB", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("STOCKPOT_BUILD_MAX_RAM_GB"));
}

#[test]
fn test_fetch_local_source() {
    let tmp = TempDir::new().unwrap();
    common::make_tarball(tmp.path(), "proj-9.9.9.tar.gz", "proj-9.9.9", &[("README", "proj\n")]);
    let data = tmp.path().join("recipe.toml");
    std::fs::write(
        &data,
        format!(
            "[sources.\"9.9.9\"]\nurl = \"{}/proj-%(version)s.tar.gz\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();
    let cache = tmp.path().join("cache");

    stockpot()
        .args(["fetch", "proj", "--version", "9.9.9", "--data"])
        .arg(&data)
        .arg("--source-cache")
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched"));

    assert!(cache.join("proj-9.9.9.tar.gz").is_file());
}

#[test]
fn test_completions_bash() {
    stockpot()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stockpot"));
}
