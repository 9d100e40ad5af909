// src/options/condition.rs

//! Predicates over the build target and resolved options
//!
//! The same [`Condition`] type gates option rules, patch operations and
//! generator arguments, so recipes express their platform and version
//! branching in one vocabulary.

use super::{BuildConfiguration, OptionValue};
use crate::error::Result;
use crate::settings::{Arch, BuildType, CompilerKind, Os, Target};
use crate::version::{Version, VersionConstraint};
use std::fmt;
use std::ops;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    Os(Vec<Os>),
    Arch(Vec<Arch>),
    Compiler(Vec<CompilerKind>),
    /// Compiler version equals one of the listed versions
    CompilerVersion(Vec<Version>),
    /// Recipe version satisfies the constraint
    Version(VersionConstraint),
    BuildType(BuildType),
    CrossBuilding,
    MsvcStaticRuntime,
    /// Option is present and truthy
    OptionEnabled(String),
    /// Option is present and equal to the value
    OptionEquals(String, OptionValue),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn os(os: Os) -> Self {
        Condition::Os(vec![os])
    }

    pub fn compiler(kind: CompilerKind) -> Self {
        Condition::Compiler(vec![kind])
    }

    /// Compiler version is one of `versions`
    pub fn compiler_version_in(versions: &[&str]) -> Result<Self> {
        let versions = versions
            .iter()
            .map(|v| Version::parse(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Condition::CompilerVersion(versions))
    }

    /// Recipe version satisfies a constraint such as `">=7.1.0, <9.0.0"`
    pub fn version(constraint: &str) -> Result<Self> {
        Ok(Condition::Version(VersionConstraint::parse(constraint)?))
    }

    pub fn option(name: &str) -> Self {
        Condition::OptionEnabled(name.to_string())
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::Always => other,
            Condition::All(mut all) => {
                all.push(other);
                Condition::All(all)
            }
            cond => Condition::All(vec![cond, other]),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Any(mut any) => {
                any.push(other);
                Condition::Any(any)
            }
            cond => Condition::Any(vec![cond, other]),
        }
    }

    /// Evaluate against a target and the options resolved so far
    pub fn holds(&self, target: &Target, config: &BuildConfiguration) -> bool {
        let settings = &target.settings;
        match self {
            Condition::Always => true,
            Condition::Os(list) => list.contains(&settings.os),
            Condition::Arch(list) => list.contains(&settings.arch),
            Condition::Compiler(list) => list.contains(&settings.compiler.kind),
            Condition::CompilerVersion(list) => list.contains(&settings.compiler.version),
            Condition::Version(constraint) => constraint.satisfies(&target.version),
            Condition::BuildType(build_type) => settings.build_type == *build_type,
            Condition::CrossBuilding => settings.cross_building(),
            Condition::MsvcStaticRuntime => settings.is_msvc_static_runtime(),
            Condition::OptionEnabled(name) => config.get_bool(name),
            Condition::OptionEquals(name, value) => config.get(name) == Some(value),
            Condition::Not(inner) => !inner.holds(target, config),
            Condition::All(all) => all.iter().all(|c| c.holds(target, config)),
            Condition::Any(any) => any.iter().any(|c| c.holds(target, config)),
        }
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        match self {
            Condition::Not(inner) => *inner,
            cond => Condition::Not(Box::new(cond)),
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::Os(list) => write!(f, "os in [{}]", join(list, ", ")),
            Condition::Arch(list) => write!(f, "arch in [{}]", join(list, ", ")),
            Condition::Compiler(list) => write!(f, "compiler in [{}]", join(list, ", ")),
            Condition::CompilerVersion(list) => {
                write!(f, "compiler.version in [{}]", join(list, ", "))
            }
            Condition::Version(c) => write!(f, "version {}", c),
            Condition::BuildType(b) => write!(f, "build_type == {}", b),
            Condition::CrossBuilding => write!(f, "cross-building"),
            Condition::MsvcStaticRuntime => write!(f, "msvc static runtime"),
            Condition::OptionEnabled(name) => write!(f, "options.{}", name),
            Condition::OptionEquals(name, value) => write!(f, "options.{} == {}", name, value),
            Condition::Not(inner) => write!(f, "not ({})", inner),
            Condition::All(all) => write!(f, "({})", join(all, " and ")),
            Condition::Any(any) => write!(f, "({})", join(any, " or ")),
        }
    }
}
