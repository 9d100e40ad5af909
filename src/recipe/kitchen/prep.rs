// src/recipe/kitchen/prep.rs

//! Source tree patching
//!
//! Patch operations run once, in declaration order, against a freshly
//! unpacked tree. Each carries a condition; operations whose condition does
//! not hold are skipped without touching the file system.

use crate::error::{Error, Result};
use crate::options::{BuildConfiguration, Condition};
use crate::settings::Target;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to do when a patch target is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchPolicy {
    /// Missing file or text is a preparation error
    Required,
    /// Missing file or text is ignored
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchAction {
    /// Replace every occurrence of `from` with `to`
    Replace { file: PathBuf, from: String, to: String },
    /// Replace every regex match with `to` (`$1` style captures allowed)
    ReplaceRegex { file: PathBuf, pattern: String, to: String },
    /// Apply a unified diff; may touch several files
    ApplyDiff { patch: PathBuf, base_path: Option<PathBuf>, strip: u32 },
    RemoveFile(PathBuf),
    RemoveDir(PathBuf),
    /// Write a file, replacing whatever is there
    WriteFile { path: PathBuf, contents: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOp {
    pub description: String,
    pub action: PatchAction,
    pub policy: PatchPolicy,
    pub when: Condition,
}

impl PatchOp {
    fn new(description: &str, action: PatchAction, policy: PatchPolicy) -> Self {
        Self {
            description: description.to_string(),
            action,
            policy,
            when: Condition::Always,
        }
    }

    pub fn replace(description: &str, file: &Path, from: &str, to: &str) -> Self {
        Self::new(
            description,
            PatchAction::Replace {
                file: file.to_path_buf(),
                from: from.to_string(),
                to: to.to_string(),
            },
            PatchPolicy::Required,
        )
    }

    pub fn replace_regex(description: &str, file: &Path, pattern: &str, to: &str) -> Self {
        Self::new(
            description,
            PatchAction::ReplaceRegex {
                file: file.to_path_buf(),
                pattern: pattern.to_string(),
                to: to.to_string(),
            },
            PatchPolicy::Required,
        )
    }

    pub fn apply_diff(description: &str, patch: &Path, base_path: Option<&Path>, strip: u32) -> Self {
        Self::new(
            description,
            PatchAction::ApplyDiff {
                patch: patch.to_path_buf(),
                base_path: base_path.map(Path::to_path_buf),
                strip,
            },
            PatchPolicy::Required,
        )
    }

    /// Removals tolerate a missing target unless made [`required`](Self::required)
    pub fn remove_file(description: &str, path: &Path) -> Self {
        Self::new(
            description,
            PatchAction::RemoveFile(path.to_path_buf()),
            PatchPolicy::BestEffort,
        )
    }

    pub fn remove_dir(description: &str, path: &Path) -> Self {
        Self::new(
            description,
            PatchAction::RemoveDir(path.to_path_buf()),
            PatchPolicy::BestEffort,
        )
    }

    pub fn write_file(description: &str, path: &Path, contents: impl Into<String>) -> Self {
        Self::new(
            description,
            PatchAction::WriteFile {
                path: path.to_path_buf(),
                contents: contents.into(),
            },
            PatchPolicy::Required,
        )
    }

    pub fn best_effort(mut self) -> Self {
        self.policy = PatchPolicy::BestEffort;
        self
    }

    pub fn required(mut self) -> Self {
        self.policy = PatchPolicy::Required;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.when = condition;
        self
    }

    pub fn applies(&self, target: &Target, config: &BuildConfiguration) -> bool {
        self.when.holds(target, config)
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        if self.policy == PatchPolicy::BestEffort {
            write!(f, " (best effort)")?;
        }
        Ok(())
    }
}

/// What happened to each patch operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub applied: Vec<String>,
    /// Condition did not hold
    pub skipped: Vec<String>,
    /// Best-effort operations whose target was missing
    pub tolerated: Vec<String>,
}

enum Outcome {
    Applied,
    Missing(String),
}

/// Apply patch operations in order
pub fn apply_patches(
    ops: &[PatchOp],
    target: &Target,
    config: &BuildConfiguration,
) -> Result<PatchReport> {
    let mut report = PatchReport::default();

    for op in ops {
        if !op.applies(target, config) {
            info!("Skipping patch: {} (requires {})", op.description, op.when);
            report.skipped.push(op.description.clone());
            continue;
        }

        debug!("Applying patch: {}", op.description);
        match apply_action(&op.action)? {
            Outcome::Applied => report.applied.push(op.description.clone()),
            Outcome::Missing(reason) => match op.policy {
                PatchPolicy::Required => {
                    return Err(Error::PreparationError(format!(
                        "{}: {}",
                        op.description, reason
                    )));
                }
                PatchPolicy::BestEffort => {
                    debug!("Tolerated missing target for '{}': {}", op.description, reason);
                    report.tolerated.push(op.description.clone());
                }
            },
        }
    }

    Ok(report)
}

fn apply_action(action: &PatchAction) -> Result<Outcome> {
    match action {
        PatchAction::Replace { file, from, to } => {
            let Some(content) = read_target(file)? else {
                return Ok(Outcome::Missing(format!("{} does not exist", file.display())));
            };
            if !content.contains(from.as_str()) {
                return Ok(Outcome::Missing(format!(
                    "pattern '{}' not found in {}",
                    from,
                    file.display()
                )));
            }
            fs::write(file, content.replace(from.as_str(), to))?;
            Ok(Outcome::Applied)
        }
        PatchAction::ReplaceRegex { file, pattern, to } => {
            let re = Regex::new(pattern).map_err(|e| {
                Error::PreparationError(format!("Invalid pattern '{}': {}", pattern, e))
            })?;
            let Some(content) = read_target(file)? else {
                return Ok(Outcome::Missing(format!("{} does not exist", file.display())));
            };
            if !re.is_match(&content) {
                return Ok(Outcome::Missing(format!(
                    "pattern '{}' not found in {}",
                    pattern,
                    file.display()
                )));
            }
            let replaced = re.replace_all(&content, to.as_str()).into_owned();
            fs::write(file, replaced)?;
            Ok(Outcome::Applied)
        }
        PatchAction::ApplyDiff {
            patch,
            base_path,
            strip,
        } => {
            let Some(text) = read_target(patch)? else {
                return Ok(Outcome::Missing(format!(
                    "patch file {} does not exist",
                    patch.display()
                )));
            };
            let Some(base) = base_path else {
                return Err(Error::PreparationError(format!(
                    "No base directory for patch {}",
                    patch.display()
                )));
            };
            apply_unified_diff(&text, base, *strip)?;
            Ok(Outcome::Applied)
        }
        PatchAction::RemoveFile(path) => {
            if !path.is_file() {
                return Ok(Outcome::Missing(format!("{} does not exist", path.display())));
            }
            fs::remove_file(path)?;
            Ok(Outcome::Applied)
        }
        PatchAction::RemoveDir(path) => {
            if !path.is_dir() {
                return Ok(Outcome::Missing(format!("{} does not exist", path.display())));
            }
            fs::remove_dir_all(path)?;
            Ok(Outcome::Applied)
        }
        PatchAction::WriteFile { path, contents } => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
            Ok(Outcome::Applied)
        }
    }
}

fn read_target(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::IoError(format!("Failed to read {}: {}", path.display(), e))),
    }
}

/// Apply a (possibly multi-file) unified diff below `base`
pub fn apply_unified_diff(text: &str, base: &Path, strip: u32) -> Result<Vec<PathBuf>> {
    let sections = split_file_diffs(text);
    if sections.is_empty() {
        return Err(Error::PreparationError(
            "Patch contains no file diffs".to_string(),
        ));
    }

    let mut touched = Vec::new();
    for section in &sections {
        let patch = diffy::Patch::from_str(section)
            .map_err(|e| Error::PreparationError(format!("Malformed patch: {}", e)))?;

        let original = patch.original().map(clean_diff_name);
        let modified = patch.modified().map(clean_diff_name);

        let name = match (original, modified) {
            (_, Some(m)) if m != "/dev/null" => m,
            (Some(o), _) if o != "/dev/null" => o,
            _ => {
                return Err(Error::PreparationError(
                    "Patch section names no file".to_string(),
                ));
            }
        };
        let relative = strip_components(name, strip).ok_or_else(|| {
            Error::PreparationError(format!("Cannot strip {} components from '{}'", strip, name))
        })?;
        let path = base.join(relative);

        if modified == Some("/dev/null") {
            debug!("Patch deletes {}", path.display());
            if path.exists() {
                fs::remove_file(&path)?;
            }
            touched.push(path);
            continue;
        }

        let current = if original == Some("/dev/null") {
            String::new()
        } else {
            read_target(&path)?.ok_or_else(|| {
                Error::PreparationError(format!("Patched file {} does not exist", path.display()))
            })?
        };

        let patched = diffy::apply(&current, &patch).map_err(|e| {
            Error::PreparationError(format!("Patch does not apply to {}: {}", path.display(), e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, patched)?;
        touched.push(path);
    }

    Ok(touched)
}

/// Split a multi-file diff into one section per file
///
/// Hunk bodies are consumed by their `@@` line counts, so removed or added
/// lines that happen to start with `--` or `++` stay inside the hunk. Git
/// preamble lines (`diff --git`, `index`, mode lines) are dropped.
fn split_file_diffs(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sections: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    // Old/new lines still owed by the hunk being read
    let mut remaining = (0usize, 0usize);

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if remaining != (0, 0) {
            if let Some(section) = current.as_mut() {
                section.push_str(line);
                section.push('\n');
            }
            remaining = match line.chars().next() {
                Some(' ') | None => (remaining.0.saturating_sub(1), remaining.1.saturating_sub(1)),
                Some('-') => (remaining.0.saturating_sub(1), remaining.1),
                Some('+') => (remaining.0, remaining.1.saturating_sub(1)),
                Some('\\') => remaining,
                // Malformed hunk; let the diff parser report it
                Some(_) => (0, 0),
            };
            continue;
        }

        let is_header = line.starts_with("--- ")
            && lines.get(i).is_some_and(|next| next.starts_with("+++ "));
        if is_header {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(format!("{}\n{}\n", line, lines[i]));
            i += 1;
            continue;
        }

        match current.as_mut() {
            Some(section) if line.starts_with("@@") => {
                remaining = hunk_counts(line).unwrap_or((0, 0));
                section.push_str(line);
                section.push('\n');
            }
            Some(section) if line.starts_with('\\') => {
                section.push_str(line);
                section.push('\n');
            }
            _ => note_skipped_line(line),
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }
    sections
}

/// Old and new line counts from a `@@ -a,b +c,d @@` hunk header
fn hunk_counts(line: &str) -> Option<(usize, usize)> {
    let mut ranges = line.strip_prefix("@@ ")?.split_whitespace();
    let old = ranges.next()?.strip_prefix('-')?;
    let new = ranges.next()?.strip_prefix('+')?;
    Some((range_len(old)?, range_len(new)?))
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((_, len)) => len.parse().ok(),
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

fn note_skipped_line(line: &str) {
    if !(line.starts_with("diff ")
        || line.starts_with("index ")
        || line.starts_with("new file mode")
        || line.starts_with("deleted file mode")
        || line.starts_with("similarity index")
        || line.starts_with("rename ")
        || line.starts_with("Only in"))
    {
        warn!("Ignoring unexpected line in patch: {}", line);
    }
}

/// Drop a trailing timestamp from a diff header file name
fn clean_diff_name(name: &str) -> &str {
    name.split('\t').next().unwrap_or(name).trim()
}

/// Drop `strip` leading components; `None` if nothing is left or the rest
/// could leave the base directory
fn strip_components(name: &str, strip: u32) -> Option<PathBuf> {
    let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
    let strip = strip as usize;
    if parts.len() <= strip {
        return None;
    }
    let rest = &parts[strip..];
    if rest.iter().any(|p| *p == ".." || *p == ".") {
        return None;
    }
    Some(rest.iter().collect())
}
