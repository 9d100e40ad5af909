// src/recipe/step.rs

//! Build and packaging steps
//!
//! Recipes describe what to run and what to copy as plain values; the cook
//! executes them in order.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Spawn a tool with the build environment overlay
    Run(Invocation),
    /// Copy files matching a pattern
    Copy(CopyRule),
    /// Write a file, creating parent directories
    Write { path: PathBuf, contents: String },
    /// Remove a directory tree if it exists
    RemoveDir(PathBuf),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Run(inv) => write!(f, "run: {}", inv),
            Step::Copy(rule) => write!(
                f,
                "copy: {} from {} to {}",
                rule.pattern,
                rule.src.display(),
                rule.dst.display()
            ),
            Step::Write { path, .. } => write!(f, "write: {}", path.display()),
            Step::RemoveDir(path) => write!(f, "rmdir: {}", path.display()),
        }
    }
}

/// A tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: &str, cwd: &Path) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Copy files under `src` whose relative path matches `pattern` into `dst`
///
/// `*` also matches path separators, so `*.h` picks up headers at any
/// depth. With `keep_path` the relative directory structure is recreated
/// under `dst`; without it files land directly in `dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRule {
    pub pattern: String,
    pub src: PathBuf,
    pub dst: PathBuf,
    pub keep_path: bool,
}

impl CopyRule {
    pub fn new(pattern: &str, src: &Path, dst: &Path, keep_path: bool) -> Self {
        Self {
            pattern: pattern.to_string(),
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            keep_path,
        }
    }

    /// Perform the copy and return the destination paths written
    ///
    /// A missing source directory copies nothing.
    pub fn apply(&self) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(&self.pattern).map_err(|e| {
            Error::PackagingError(format!("Invalid copy pattern '{}': {}", self.pattern, e))
        })?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        if !self.src.is_dir() {
            return Ok(Vec::new());
        }

        let mut copied = Vec::new();
        for entry in WalkDir::new(&self.src).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.src) else {
                continue;
            };
            let relative_str = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !pattern.matches_with(&relative_str, options) {
                continue;
            }

            let target = if self.keep_path {
                self.dst.join(relative)
            } else {
                self.dst.join(entry.file_name())
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied.push(target);
        }

        Ok(copied)
    }
}
