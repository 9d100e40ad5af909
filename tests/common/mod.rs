// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use stockpot::Profile;

/// Profile for a native Linux/gcc target, with extra TOML appended.
pub fn linux_gcc_profile(compiler_version: &str, extra: &str) -> Profile {
    Profile::parse(&format!(
        "[settings]\nos = \"Linux\"\narch = \"x86_64\"\ncompiler = \"gcc\"\n\"compiler.version\" = \"{}\"\n\"compiler.libcxx\" = \"libstdc++11\"\nbuild_type = \"Release\"\n{}",
        compiler_version, extra
    ))
    .unwrap()
}

/// Profile for a Windows/MSVC target.
pub fn windows_msvc_profile(compiler_version: &str) -> Profile {
    Profile::parse(&format!(
        "[settings]\nos = \"Windows\"\narch = \"x86_64\"\ncompiler = \"msvc\"\n\"compiler.version\" = \"{}\"\n\"compiler.runtime\" = \"dynamic\"\nbuild_type = \"Release\"\n",
        compiler_version
    ))
    .unwrap()
}

/// Write a `.tar.gz` holding `files` under a single `root/` directory.
///
/// Returns the archive path.
pub fn make_tarball(dir: &Path, name: &str, root: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (rel, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", root, rel), contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
    path
}
