// src/recipe/kitchen/cook.rs

//! Cook: the actual build execution for a single recipe

use crate::env::ScriptFlavor;
use crate::error::{Error, Result};
use crate::generator::GeneratorArgs;
use crate::manifest::PackageManifest;
use crate::recipe::{BuildContext, Layout, Recipe, Step};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::archive::extract_archive;
use super::config::CookResult;
use super::prep::{PatchOp, PatchReport, apply_patches};
use super::Kitchen;

/// A single cook operation
pub struct Cook<'a> {
    kitchen: &'a Kitchen,
    recipe: &'a dyn Recipe,
    ctx: &'a BuildContext,
    /// Temporary work directory (source and build trees)
    work_dir: TempDir,
    layout: Layout,
    /// `<output>/<name>-<version>`
    final_dir: PathBuf,
    /// Set once the staging directory has been renamed into place
    promoted: bool,
    /// Local copy of the source archive
    archive: Option<PathBuf>,
    generator_args: GeneratorArgs,
    patches: PatchReport,
    jobs: u32,
    /// Build log accumulator
    log: String,
    warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(
        kitchen: &'a Kitchen,
        recipe: &'a dyn Recipe,
        ctx: &'a BuildContext,
        output_dir: &Path,
        jobs: u32,
    ) -> Result<Self> {
        let name = recipe.info().name;
        let prefix = format!("stockpot-{}-", name);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).keep(kitchen.config.keep_builddir);
        let work_dir = match &kitchen.config.work_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| Error::IoError(format!("Failed to create work directory: {}", e)))?;

        let package_name = format!("{}-{}", name, ctx.version());
        let staging = output_dir.join(format!(".{}.partial", package_name));
        let layout = Layout::under(work_dir.path(), &staging);

        fs::create_dir_all(&layout.source_dir)?;
        fs::create_dir_all(&layout.build_dir)?;

        Ok(Self {
            kitchen,
            recipe,
            ctx,
            work_dir,
            layout,
            final_dir: output_dir.join(package_name),
            promoted: false,
            archive: None,
            generator_args: GeneratorArgs::default(),
            patches: PatchReport::default(),
            jobs,
            log: String::new(),
            warnings: Vec::new(),
        })
    }

    /// Phase 1: Prep - fetch the source archive into the work directory
    pub(super) fn prep(&mut self) -> Result<()> {
        let version = self.ctx.version();
        let cached = self.kitchen.fetch(self.recipe, version)?;

        let filename = self.recipe.data().archive_filename(version)?;
        let local = self.work_dir.path().join(&filename);
        fs::copy(&cached, &local)?;

        self.log_line(&format!(
            "Fetched source: {}",
            self.recipe.data().archive_url(version)?
        ));
        self.archive = Some(local);
        Ok(())
    }

    /// Phase 2a: Unpack sources
    pub(super) fn unpack(&mut self) -> Result<()> {
        let Some(archive) = self.archive.clone() else {
            return Err(Error::PreparationError("No source archive fetched".to_string()));
        };
        let source = self.recipe.data().source_for(self.ctx.version())?;

        let dest = match &source.destination {
            Some(sub) => self.layout.source_dir.join(sub),
            None => self.layout.source_dir.clone(),
        };
        let count = extract_archive(&archive, &dest, source.strip_root)
            .map_err(|e| Error::PreparationError(format!("Failed to unpack {}: {}", archive.display(), e)))?;

        self.log_line(&format!("Extracted {} entries to {}", count, dest.display()));
        Ok(())
    }

    /// Phase 2b: Apply patches
    ///
    /// Diff patches listed in the recipe data come first, then the recipe's
    /// own operations, in declaration order.
    pub(super) fn patch(&mut self) -> Result<()> {
        let data = self.recipe.data();
        let mut ops: Vec<PatchOp> = data
            .patches_for(self.ctx.version())
            .iter()
            .map(|entry| {
                let base = match &entry.base_path {
                    Some(sub) => self.layout.source_dir.join(sub),
                    None => self.layout.source_dir.clone(),
                };
                let description = entry
                    .patch_description
                    .clone()
                    .unwrap_or_else(|| entry.patch_file.clone());
                PatchOp::apply_diff(&description, &data.patch_path(entry), Some(&base), entry.strip)
            })
            .collect();
        ops.extend(self.recipe.patches(self.ctx, &self.layout)?);

        self.patches = apply_patches(&ops, &self.ctx.target, &self.ctx.config)?;
        for description in &self.patches.applied {
            self.log.push_str(&format!("Patched: {}\n", description));
        }
        for description in &self.patches.tolerated {
            self.warnings.push(format!("Patch target missing: {}", description));
        }
        Ok(())
    }

    /// Phase 3: Simmer - run the generator and build tool
    pub(super) fn simmer(&mut self) -> Result<()> {
        self.generator_args = self.recipe.generator_args(self.ctx, &self.layout)?;
        debug!("Generator arguments:\n{}", self.generator_args.to_gn());

        let flavor = ScriptFlavor::host();
        let env = self.recipe.environment(self.ctx, &self.layout);
        fs::write(
            self.layout.build_dir.join(flavor.file_name()),
            env.render_script(flavor),
        )?;

        let steps = self
            .recipe
            .build_steps(self.ctx, &self.layout, &self.generator_args, self.jobs);
        self.run_steps(&steps)
    }

    /// Phase 4: Plate - stage artifacts, promote, and write the manifest
    pub(super) fn plate(&mut self) -> Result<PackageManifest> {
        let staging = self.layout.package_dir.clone();
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let steps = self.recipe.package_steps(self.ctx, &self.layout);
        self.run_steps(&steps)?;

        for pattern in self.recipe.required_artifacts(self.ctx) {
            if !artifact_present(&staging, &pattern)? {
                return Err(Error::PackagingError(format!(
                    "Expected artifact '{}' missing from package",
                    pattern
                )));
            }
        }

        if self.final_dir.exists() {
            warn!("Replacing existing package {}", self.final_dir.display());
            fs::remove_dir_all(&self.final_dir)?;
        }
        fs::rename(&staging, &self.final_dir).map_err(|e| {
            Error::PackagingError(format!(
                "Failed to move package into {}: {}",
                self.final_dir.display(),
                e
            ))
        })?;
        self.promoted = true;

        let manifest = self.recipe.package_info(self.ctx, &self.final_dir)?;
        let path = manifest.write_to(&self.final_dir)?;
        self.log_line(&format!("Wrote manifest {}", path.display()));
        Ok(manifest)
    }

    /// Consume the cook into its result
    pub(super) fn finish(self, manifest: PackageManifest) -> CookResult {
        let build_dir = self
            .kitchen
            .config
            .keep_builddir
            .then(|| self.work_dir.path().to_path_buf());
        if let Some(dir) = &build_dir {
            info!("Keeping work directory {}", dir.display());
        }

        CookResult {
            package_dir: self.final_dir,
            manifest,
            generator_args: self.generator_args,
            patches: self.patches,
            jobs: self.jobs,
            log: self.log,
            warnings: self.warnings,
            build_dir,
        }
    }

    /// Remove whatever part of the package exists after a failure
    pub(super) fn discard(&self) {
        let mut dirs = vec![&self.layout.package_dir];
        if self.promoted {
            dirs.push(&self.final_dir);
        }
        for dir in dirs.into_iter().filter(|d| d.exists()) {
            if let Err(e) = fs::remove_dir_all(dir) {
                warn!("Failed to remove {}: {}", dir.display(), e);
            }
        }
        if self.kitchen.config.keep_builddir {
            info!("Keeping work directory {}", self.work_dir.path().display());
        }
    }

    fn run_steps(&mut self, steps: &[Step]) -> Result<()> {
        for step in steps {
            debug!("{}", step);
            match step {
                Step::Run(inv) => {
                    let env = self.recipe.environment(self.ctx, &self.layout);
                    let mut cmd = Command::new(&inv.program);
                    cmd.args(&inv.args).current_dir(&inv.cwd);
                    env.apply_to(&mut cmd);

                    self.log_line(&format!("$ {}", inv));
                    let (status, stdout, stderr) = stream_output(&inv.program, &mut cmd)?;
                    self.log.push_str(&stdout);
                    self.log.push_str(&stderr);

                    if !status.success() {
                        return Err(Error::BuildError(format!(
                            "{} failed with {}: {}",
                            inv.program,
                            status,
                            tail(&stderr, 20)
                        )));
                    }
                }
                Step::Copy(rule) => {
                    let copied = rule.apply()?;
                    self.log_line(&format!("Copied {} file(s) matching {}", copied.len(), rule.pattern));
                }
                Step::Write { path, contents } => {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, contents)?;
                    self.log_line(&format!("Wrote {}", path.display()));
                }
                Step::RemoveDir(path) => {
                    if path.is_dir() {
                        fs::remove_dir_all(path)?;
                        self.log_line(&format!("Removed {}", path.display()));
                    }
                }
            }
        }
        Ok(())
    }

    fn log_line(&mut self, line: &str) {
        debug!("{}", line);
        self.log.push_str(line);
        self.log.push('\n');
    }
}

/// Run a tool, forwarding each output line to the log as it arrives
///
/// Returns the exit status with the collected stdout and stderr.
fn stream_output(program: &str, cmd: &mut Command) -> Result<(ExitStatus, String, String)> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::BuildError(format!("Failed to run {}: {}", program, e)))?;

    let stderr_pipe = child.stderr.take();
    let tag = program.to_string();
    let stderr_reader = thread::spawn(move || {
        let mut collected = String::new();
        if let Some(pipe) = stderr_pipe {
            for line in BufReader::new(pipe).lines().map_while(io::Result::ok) {
                warn!("[{}] {}", tag, line);
                collected.push_str(&line);
                collected.push('\n');
            }
        }
        collected
    });

    let mut stdout = String::new();
    if let Some(pipe) = child.stdout.take() {
        for line in BufReader::new(pipe).lines().map_while(io::Result::ok) {
            info!("[{}] {}", program, line);
            stdout.push_str(&line);
            stdout.push('\n');
        }
    }

    let status = child
        .wait()
        .map_err(|e| Error::BuildError(format!("Failed to wait for {}: {}", program, e)))?;
    let stderr = stderr_reader
        .join()
        .map_err(|_| Error::BuildError(format!("Lost the stderr of {}", program)))?;
    Ok((status, stdout, stderr))
}

/// Whether a glob relative to `root` matches at least one path
fn artifact_present(root: &Path, pattern: &str) -> Result<bool> {
    let full = root.join(pattern);
    let full = full.to_string_lossy();
    let mut matches = glob::glob(&full)
        .map_err(|e| Error::PackagingError(format!("Invalid artifact pattern '{}': {}", pattern, e)))?;
    Ok(matches.any(|m| m.is_ok()))
}

/// Last `n` lines of tool output
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_present() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("lib/libproj.a"), b"").unwrap();

        assert!(artifact_present(tmp.path(), "lib/libproj.*").unwrap());
        assert!(!artifact_present(tmp.path(), "lib/*.so").unwrap());
        assert!(!artifact_present(tmp.path(), "include/*.h").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_output_collects_both_pipes() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo configured; echo 'warning: deprecated' >&2; echo built"]);
        let (status, stdout, stderr) = stream_output("sh", &mut cmd).unwrap();
        assert!(status.success());
        assert_eq!(stdout, "configured\nbuilt\n");
        assert_eq!(stderr, "warning: deprecated\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_output_reports_exit_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 4"]);
        let (status, stdout, stderr) = stream_output("sh", &mut cmd).unwrap();
        assert_eq!(status.code(), Some(4));
        assert!(stdout.is_empty());
        assert_eq!(stderr, "boom\n");
    }

    #[test]
    fn test_stream_output_missing_program() {
        let mut cmd = Command::new("stockpot-no-such-tool");
        let err = stream_output("stockpot-no-such-tool", &mut cmd).unwrap_err();
        assert!(matches!(err, Error::BuildError(_)));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("only", 5), "only");
        assert_eq!(tail("", 3), "");
    }
}
