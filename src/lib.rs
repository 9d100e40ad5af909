// src/lib.rs

//! Stockpot
//!
//! Recipe-driven builds of third-party native libraries. A recipe resolves
//! its options against the target platform, prepares and patches the
//! upstream source, drives the project's own generator and build tool, and
//! stages the result as a package directory with a manifest consumers can
//! read.
//!
//! # Pipeline
//!
//! - Options: declared defaults, user overrides and an ordered rule table
//!   resolve into a frozen [`BuildConfiguration`]
//! - Prep: fetch, unpack and patch the source in a fresh work directory
//! - Simmer: generator arguments and an environment overlay drive CMake or GN
//! - Plate: artifacts are staged, verified and promoted with a manifest

pub mod cookbook;
pub mod env;
mod error;
pub mod generator;
pub mod jobs;
pub mod manifest;
pub mod options;
pub mod profile;
pub mod recipe;
pub mod settings;
pub mod version;

pub use env::{EnvOp, EnvOverlay, ScriptFlavor};
pub use error::{Error, Result};
pub use generator::{GeneratorArg, GeneratorArgs};
pub use manifest::{CppInfo, MANIFEST_FILE, PackageManifest};
pub use options::{BuildConfiguration, Condition, OptionDecl, OptionValue, Rule};
pub use profile::Profile;
pub use recipe::{BuildContext, Kitchen, KitchenConfig, Layout, Recipe, configure};
pub use settings::{Arch, BuildType, Compiler, CompilerKind, Os, Settings, Target};
pub use version::{Version, VersionConstraint};
