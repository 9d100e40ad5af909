// src/cookbook/v8.rs

//! V8 JavaScript engine, built with GN and Ninja from a pre-fetched tree
//!
//! The source tarball carries `v8/` and `depot_tools/` side by side. The
//! recipe overlays a few GN files so the host compiler and C++ runtime are
//! used instead of the bundled clang and libc++.

use super::{base_manifest, embedded};
use crate::env::EnvOverlay;
use crate::error::{Error, Result};
use crate::generator::{GeneratorArgs, gn_bool, gn_string};
use crate::manifest::PackageManifest;
use crate::options::{Condition, OptionDecl, OptionValue, Rule};
use crate::recipe::{
    BuildContext, CopyRule, Invocation, Layout, PatchOp, Recipe, RecipeData, RecipeInfo, Step,
};
use crate::settings::{Arch, CompilerKind, Os};
use crate::version::Version;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

const DATA: &str = include_str!("../../recipes/v8/recipe.toml");
const LINUX_TOOLCHAIN_GN: &str = include_str!("../../recipes/v8/files/v8_linux_toolchain.gn");
const LIBCXX_CONFIG_GN: &str = include_str!("../../recipes/v8/files/v8_libcxx_config.gn");
const MSVC_CONFIG_GN: &str = include_str!("../../recipes/v8/files/v8_msvc.gn");

const LIBCXX_CONFIG_ENTRY: &str = "  \"//build/config/stockpot/libcxx:stockpot_libcxx\",\n";

/// `v8/chrome/VERSION`; the build timestamp script reads the `PATCH=` line
const CHROME_VERSION: &str = "Line 1\nLine 2\nLine 3\nPATCH=0\n";

pub struct V8Recipe {
    data: RecipeData,
}

impl V8Recipe {
    pub fn new() -> Result<Self> {
        Ok(Self::with_data(embedded("v8", DATA)?))
    }

    pub fn with_data(data: RecipeData) -> Self {
        Self { data }
    }

    fn v8_root(layout: &Layout) -> PathBuf {
        layout.source_dir.join("v8")
    }

    /// Debug V8 either because the build type says so or by explicit request
    fn want_debug(ctx: &BuildContext) -> bool {
        ctx.settings().is_debug() || ctx.option("is_debug")
    }

    /// Architecture as GN spells it
    pub fn gn_arch(arch: Arch) -> &'static str {
        match arch {
            Arch::X86_64 => "x64",
            Arch::Armv8 => "arm64",
            Arch::X86 => "x86",
            Arch::Armv7 => "armv7",
        }
    }
}

impl Recipe for V8Recipe {
    fn info(&self) -> RecipeInfo {
        RecipeInfo {
            name: "v8",
            description: "V8 is Google's open source JavaScript engine.",
            license: "BSD",
            homepage: "https://v8.dev",
        }
    }

    fn data(&self) -> &RecipeData {
        &self.data
    }

    fn options(&self) -> Vec<OptionDecl> {
        vec![
            OptionDecl::boolean("shared", false),
            OptionDecl::boolean("fPIC", true),
            OptionDecl::tristate("use_rtti"),
            OptionDecl::boolean("is_debug", false),
            OptionDecl::boolean("dcheck_always_on", false),
            OptionDecl::choice("symbol_level", &["0", "1", "2"], true, OptionValue::Default),
            OptionDecl::boolean("v8_enable_sandbox", false),
            OptionDecl::boolean("v8_enable_webassembly", false),
        ]
    }

    fn rules(&self) -> Result<Vec<Rule>> {
        let windows = Condition::os(Os::Windows);
        let msvc = Condition::compiler(CompilerKind::Msvc);
        let clang = Condition::compiler(CompilerKind::Clang);

        Ok(vec![
            Rule::remove(windows.clone(), "fPIC"),
            Rule::reject(
                windows
                    .clone()
                    .and(msvc.clone())
                    .and(!Condition::compiler_version_in(&["191", "192", "193"])?),
                "Only msvc 191, 192 and 193 are supported (Visual Studio 2017, 2019, 2022)",
            ),
            Rule::reject(
                windows
                    .clone()
                    .and(clang.clone())
                    .and(!Condition::compiler_version_in(&["18"])?),
                "Only clang 18 is supported on Windows",
            ),
            Rule::reject(
                windows.clone().and(!msvc.or(clang)),
                "Only msvc and clang are supported on Windows",
            ),
            Rule::reject(
                Condition::compiler(CompilerKind::Gcc).and(!Condition::compiler_version_in(&["9"])?),
                "V8 only compiles with gcc 9; newer releases reject its constexpr use-before-definition",
            ),
            Rule::reject(
                windows.and(Condition::option("shared")),
                "Shared V8 builds are not supported on Windows",
            ),
        ])
    }

    fn tools(&self, ctx: &BuildContext) -> Vec<String> {
        let mut tools = vec!["ninja".to_string(), "python".to_string()];
        if ctx.settings().os != Os::Windows {
            tools.extend(["bison", "gperf", "flex"].map(String::from));
        }
        tools
    }

    fn check_system(&self, _ctx: &BuildContext) -> Result<()> {
        let python = which::which("python").map_err(|_| {
            Error::ConfigurationError("Python must be available in PATH to build v8".to_string())
        })?;
        let output = Command::new(&python)
            .arg("--version")
            .output()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to run {}: {}", python.display(), e))
            })?;

        // Python 2 prints its version on stderr
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let version = check_python_version(&text)?;
        info!("Found Python {} at {}", version, python.display());
        Ok(())
    }

    fn patches(&self, ctx: &BuildContext, layout: &Layout) -> Result<Vec<PatchOp>> {
        let v8 = Self::v8_root(layout);
        let config_dir = v8.join("build").join("config");
        let buildconfig = config_dir.join("BUILDCONFIG.gn");
        let linux = Condition::os(Os::Linux);
        let linux_or_mac = Condition::Os(vec![Os::Linux, Os::Macos]);

        let toolchain = LINUX_TOOLCHAIN_GN
            .replace("stockpot_compiler_cc", &ctx.toolchain.cc)
            .replace("stockpot_compiler_cxx", &ctx.toolchain.cxx);

        Ok(vec![
            PatchOp::write_file(
                "install host compiler toolchain",
                &v8.join("build")
                    .join("toolchain")
                    .join("stockpot")
                    .join("linux")
                    .join("BUILD.gn"),
                toolchain,
            )
            .when(linux.clone()),
            PatchOp::replace(
                "drop -Wno-thread-safety-reference-return for clang 17",
                &config_dir.join("compiler").join("BUILD.gn"),
                "-Wno-thread-safety-reference-return",
                "",
            )
            .when(
                linux
                    .and(Condition::Compiler(vec![CompilerKind::Clang, CompilerKind::AppleClang]))
                    .and(Condition::compiler_version_in(&["17"])?),
            ),
            PatchOp::write_file(
                "install libcxx config",
                &config_dir.join("stockpot").join("libcxx").join("BUILD.gn"),
                LIBCXX_CONFIG_GN,
            )
            .when(linux_or_mac.clone()),
            PatchOp::replace(
                "remove previous libcxx config entry",
                &buildconfig,
                LIBCXX_CONFIG_ENTRY,
                "",
            )
            .best_effort()
            .when(linux_or_mac.clone()),
            PatchOp::replace(
                "add libcxx config to default compiler configs",
                &buildconfig,
                "default_compiler_configs = [",
                &format!("default_compiler_configs = [\n{}", LIBCXX_CONFIG_ENTRY),
            )
            .when(linux_or_mac),
            PatchOp::write_file(
                "install msvc runtime config",
                &config_dir.join("stockpot").join("msvc").join("BUILD.gn"),
                MSVC_CONFIG_GN,
            )
            .when(Condition::compiler(CompilerKind::Msvc).and(!Condition::MsvcStaticRuntime)),
            PatchOp::replace(
                "use dynamic msvc runtime config",
                &buildconfig,
                "//build/config/win:default_crt",
                "//build/config/stockpot/msvc:stockpot_crt\",\n    \"//build/config/stockpot/msvc:stockpot_ignore_warnings",
            )
            .when(Condition::compiler(CompilerKind::Msvc).and(!Condition::MsvcStaticRuntime)),
            PatchOp::write_file(
                "write chrome/VERSION",
                &v8.join("chrome").join("VERSION"),
                CHROME_VERSION,
            ),
        ])
    }

    fn environment(&self, ctx: &BuildContext, layout: &Layout) -> EnvOverlay {
        let settings = ctx.settings();
        let depot_tools = layout
            .source_dir
            .join("depot_tools")
            .to_string_lossy()
            .into_owned();

        let mut env = EnvOverlay::new();
        env.prepend_path("PATH", depot_tools.as_str())
            .define("DEPOT_TOOLS_PATH", depot_tools);

        if settings.os == Os::Windows {
            env.define("DEPOT_TOOLS_WIN_TOOLCHAIN", "0");
            let msvs = match (settings.compiler.kind, settings.compiler.version.as_str()) {
                (CompilerKind::Msvc, "191") => Some("2017"),
                (CompilerKind::Msvc, "192") => Some("2019"),
                (CompilerKind::Msvc, "193") | (CompilerKind::Clang, "18") => Some("2022"),
                _ => None,
            };
            if let Some(msvs) = msvs {
                env.define("GYP_MSVS_VERSION", msvs);
            }
        }

        if settings.os == Os::Macos && settings.arch == Arch::Armv8 {
            env.define(
                "VPYTHON_BYPASS",
                "manually managed python not supported by chrome operations",
            );
        }
        env
    }

    fn generator_args(&self, ctx: &BuildContext, _layout: &Layout) -> Result<GeneratorArgs> {
        let settings = ctx.settings();
        let compiler = &settings.compiler;
        let debug = Self::want_debug(ctx);
        let shared = ctx.option("shared");
        let mut args = GeneratorArgs::new();

        args.push("is_official_build", gn_bool(!debug))
            .push("chrome_pgo_phase", "0")
            .push("is_cfi", gn_bool(false))
            .push("use_lld", gn_bool(false))
            .push("use_gold", gn_bool(false))
            .push("use_thin_lto", gn_bool(false))
            .push("dcheck_always_on", gn_bool(ctx.option("dcheck_always_on")))
            .push("is_debug", gn_bool(debug))
            .push("target_cpu", gn_string(Self::gn_arch(settings.arch)))
            .push("is_chrome_branded", gn_bool(false))
            .push("treat_warnings_as_errors", gn_bool(false))
            .push("use_glib", gn_bool(false))
            .push("use_sysroot", gn_bool(false))
            .push("use_custom_libcxx", gn_bool(false))
            .push("use_custom_libcxx_for_host", gn_bool(false))
            .push("v8_monolithic", gn_bool(!shared))
            .push("v8_static_library", gn_bool(!shared))
            .push("is_component_build", gn_bool(shared))
            .push("v8_generate_external_defines_header", gn_bool(true))
            .push("v8_enable_sandbox", gn_bool(ctx.option("v8_enable_sandbox")))
            .push("v8_enable_webassembly", gn_bool(ctx.option("v8_enable_webassembly")))
            .push("v8_enable_gdbjit", gn_bool(false))
            .push("is_clang", gn_bool(compiler.kind.is_clang()));

        if compiler.kind.is_clang() {
            let version = compiler.version.as_str();
            args.push("clang_use_chrome_plugins", gn_bool(false))
                .push("clang_base_path", gn_string(&format!("/usr/lib/llvm-{}", version)))
                .push("clang_version", version);
            if compiler.version == "17" {
                args.push("llvm_android_mainline", gn_bool(true));
            }
        }

        if let Some(level) = ctx.config.get("symbol_level")
            && !level.is_default()
        {
            args.push("symbol_level", level.to_string());
        }
        if let Some(rtti) = ctx.config.get("use_rtti")
            && !rtti.is_default()
        {
            args.push("use_rtti", gn_bool(rtti.is_true()));
        }

        if settings.os == Os::Windows {
            args.push("target_os", gn_string("win"));
            if let Some(runtime) = settings.msvc_runtime_flag() {
                args.push("stockpot_compiler_runtime", gn_string(runtime));
            }
        }

        args.push("v8_use_external_startup_data", gn_bool(false));

        if settings.os == Os::Linux {
            let toolchain = gn_string(&format!(
                "//build/toolchain/stockpot/linux:{}_{}",
                compiler.kind, settings.arch
            ));
            args.push("custom_toolchain", toolchain.as_str())
                .push("host_toolchain", toolchain);
        }

        if matches!(settings.os, Os::Linux | Os::Macos) {
            args.push("stockpot_compiler_name", gn_string(compiler.kind.as_ref()))
                .push(
                    "stockpot_compiler_libcxx",
                    gn_string(compiler.libcxx().unwrap_or_default()),
                );
        }

        Ok(args)
    }

    fn memory_per_job_gb(&self, ctx: &BuildContext) -> Option<f64> {
        Some(if Self::want_debug(ctx) { 2.0 } else { 1.0 })
    }

    fn build_steps(
        &self,
        ctx: &BuildContext,
        layout: &Layout,
        args: &GeneratorArgs,
        jobs: u32,
    ) -> Vec<Step> {
        let v8 = Self::v8_root(layout);
        let build = layout.build_dir.to_string_lossy().into_owned();
        let jobs = jobs.to_string();

        let mut compile = Invocation::new("ninja", &v8).args(["-j", jobs.as_str(), "-C", build.as_str()]);
        if !ctx.option("shared") {
            compile = compile.arg("v8_monolith");
        }

        vec![
            Step::Write {
                path: layout.build_dir.join("args.gn"),
                contents: args.to_gn(),
            },
            Step::Run(Invocation::new("gn", &v8).args(["gen", build.as_str()])),
            // v8-gn.h must exist before the rest of the tree compiles
            Step::Run(
                Invocation::new("ninja", &v8)
                    .args(["-v", "-j", jobs.as_str(), "-C", build.as_str(), "gen_v8_gn"]),
            ),
            Step::Copy(CopyRule::new(
                "*.h",
                &layout.build_dir.join("gen").join("include"),
                &v8.join("include"),
                true,
            )),
            Step::Run(compile),
        ]
    }

    fn package_steps(&self, ctx: &BuildContext, layout: &Layout) -> Vec<Step> {
        let v8 = Self::v8_root(layout);
        let build = &layout.build_dir;
        let pkg = &layout.package_dir;
        let lib = pkg.join("lib");

        let mut steps = vec![
            Step::Copy(CopyRule::new("LICENSE*", &v8, &pkg.join("licenses"), false)),
            Step::Copy(CopyRule::new("*.h", &v8.join("include"), &pkg.join("include"), true)),
            Step::Copy(CopyRule::new(
                "*.h",
                &build.join("gen").join("include"),
                &pkg.join("include"),
                true,
            )),
            Step::Copy(CopyRule::new("icudtl.dat", build, &pkg.join("res"), false)),
            Step::Copy(CopyRule::new("args.gn", build, pkg, false)),
        ];

        let library = match (ctx.settings().os, ctx.option("shared")) {
            (Os::Windows, _) => CopyRule::new("*v8_monolith.lib", build, &lib, false),
            (_, true) => CopyRule::new("lib*.so", build, &lib, false),
            (_, false) => CopyRule::new("libv8_monolith.a", &build.join("obj"), &lib, false),
        };
        steps.push(Step::Copy(library));
        steps
    }

    fn required_artifacts(&self, ctx: &BuildContext) -> Vec<String> {
        let library = match (ctx.settings().os, ctx.option("shared")) {
            (Os::Windows, _) => "lib/*v8_monolith.lib",
            (_, true) => "lib/libv8.so",
            (_, false) => "lib/libv8_monolith.a",
        };
        vec!["include/v8.h".to_string(), library.to_string()]
    }

    fn package_info(&self, ctx: &BuildContext, _package_dir: &Path) -> Result<PackageManifest> {
        let mut manifest = base_manifest(self, ctx);
        let cpp = &mut manifest.cpp_info;

        cpp.libs = if ctx.option("shared") {
            vec!["v8".to_string(), "v8_libplatform".to_string()]
        } else {
            vec!["v8_monolith".to_string()]
        };
        // Embedders pick up v8-gn.h through this define
        cpp.defines.push("V8_GN_HEADER=1".to_string());

        match ctx.settings().os {
            Os::Windows => {
                cpp.system_libs
                    .extend(["winmm.lib", "dbghelp.lib"].map(String::from));
            }
            Os::Linux => {
                cpp.cxxflags.push("-pthread".to_string());
                cpp.system_libs
                    .extend(["pthread", "dl", "atomic"].map(String::from));
            }
            _ => {}
        }

        Ok(manifest)
    }
}

/// Validate `python --version` output for depot_tools
///
/// Accepts Python `>=2.7.5, <3` or `>=3.8`.
pub fn check_python_version(output: &str) -> Result<Version> {
    let re = Regex::new(r"Python (\d+\.\d+\.\d+)")
        .map_err(|e| Error::ConfigurationError(format!("Invalid version pattern: {}", e)))?;
    let raw = re
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            Error::ConfigurationError(format!(
                "Unrecognized python version output: '{}'",
                output.trim()
            ))
        })?;
    let version = Version::parse(raw)?;

    let python2 = version >= "2.7.5" && version < "3.0.0";
    if python2 || version >= "3.8.0" {
        Ok(version)
    } else {
        Err(Error::ConfigurationError(format!(
            "Found Python {}, but v8 requires >= 2.7.5 and < 3.0.0, or >= 3.8.0",
            version
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use crate::recipe::configure;

    fn profile(settings: &str) -> Profile {
        Profile::parse(&format!("[settings]\n{}", settings)).unwrap()
    }

    fn linux_gcc9() -> Profile {
        profile(
            "os = \"Linux\"\narch = \"x86_64\"\ncompiler = \"gcc\"\n\"compiler.version\" = \"9\"\n",
        )
    }

    #[test]
    fn test_python_versions() {
        assert!(check_python_version("Python 2.7.18\n").is_ok());
        assert!(check_python_version("Python 3.11.4").is_ok());
        assert!(check_python_version("Python 3.8.0").is_ok());
        assert!(check_python_version("Python 2.7.4").is_err());
        assert!(check_python_version("Python 3.7.9").is_err());
        assert!(check_python_version("not python").is_err());
    }

    #[test]
    fn test_rejects_newer_gcc() {
        let recipe = V8Recipe::new().unwrap();
        let p = profile(
            "os = \"Linux\"\narch = \"x86_64\"\ncompiler = \"gcc\"\n\"compiler.version\" = \"12\"\n",
        );
        let err = configure(&recipe, "11.6.189.19", &p).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_windows_compilers() {
        let recipe = V8Recipe::new().unwrap();
        let ok = profile(
            "os = \"Windows\"\narch = \"x86_64\"\ncompiler = \"msvc\"\n\"compiler.version\" = \"193\"\n",
        );
        let ctx = configure(&recipe, "11.6.189.19", &ok).unwrap();
        assert!(!ctx.config.contains("fPIC"));

        for (compiler, version) in [("msvc", "190"), ("clang", "17"), ("gcc", "9")] {
            let p = profile(&format!(
                "os = \"Windows\"\narch = \"x86_64\"\ncompiler = \"{}\"\n\"compiler.version\" = \"{}\"\n",
                compiler, version
            ));
            assert!(
                configure(&recipe, "11.6.189.19", &p).is_err(),
                "{} {}",
                compiler,
                version
            );
        }

        let mut shared = ok.clone();
        shared.set_option("shared=True").unwrap();
        assert!(configure(&recipe, "11.6.189.19", &shared).is_err());
    }

    #[test]
    fn test_gn_args_linux_static() {
        let recipe = V8Recipe::new().unwrap();
        let ctx = configure(&recipe, "11.6.189.19", &linux_gcc9()).unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let args = recipe.generator_args(&ctx, &layout).unwrap();

        assert_eq!(args.get_last("is_official_build"), Some("true"));
        assert_eq!(args.get_last("target_cpu"), Some("\"x64\""));
        assert_eq!(args.get_last("v8_monolithic"), Some("true"));
        assert_eq!(args.get_last("is_component_build"), Some("false"));
        assert_eq!(args.get_last("is_clang"), Some("false"));
        assert_eq!(args.get_last("symbol_level"), None);
        assert_eq!(args.get_last("use_rtti"), None);
        assert_eq!(
            args.get_last("custom_toolchain"),
            Some("\"//build/toolchain/stockpot/linux:gcc_x86_64\"")
        );
        assert_eq!(args.get_last("stockpot_compiler_libcxx"), Some("\"libstdc++11\""));
        assert_eq!(recipe.memory_per_job_gb(&ctx), Some(1.0));
    }

    #[test]
    fn test_gn_args_passthrough_and_clang() {
        let recipe = V8Recipe::new().unwrap();
        let mut p = profile(
            "os = \"Linux\"\narch = \"armv8\"\ncompiler = \"clang\"\n\"compiler.version\" = \"17\"\nbuild_type = \"Debug\"\n",
        );
        p.set_option("symbol_level=1").unwrap();
        p.set_option("use_rtti=True").unwrap();
        let ctx = configure(&recipe, "11.6.189.19", &p).unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let args = recipe.generator_args(&ctx, &layout).unwrap();

        assert_eq!(args.get_last("is_debug"), Some("true"));
        assert_eq!(args.get_last("target_cpu"), Some("\"arm64\""));
        assert_eq!(args.get_last("clang_base_path"), Some("\"/usr/lib/llvm-17\""));
        assert_eq!(args.get_last("clang_version"), Some("17"));
        assert_eq!(args.get_last("llvm_android_mainline"), Some("true"));
        assert_eq!(args.get_last("symbol_level"), Some("1"));
        assert_eq!(args.get_last("use_rtti"), Some("true"));
        assert_eq!(recipe.memory_per_job_gb(&ctx), Some(2.0));
    }

    #[test]
    fn test_environment() {
        let recipe = V8Recipe::new().unwrap();
        let p = profile(
            "os = \"Windows\"\narch = \"x86_64\"\ncompiler = \"msvc\"\n\"compiler.version\" = \"192\"\n",
        );
        let ctx = configure(&recipe, "11.0.226.19", &p).unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let env = recipe
            .environment(&ctx, &layout)
            .resolve_with(|_| None);

        assert_eq!(env["GYP_MSVS_VERSION"], "2019");
        assert_eq!(env["DEPOT_TOOLS_WIN_TOOLCHAIN"], "0");
        assert!(env["DEPOT_TOOLS_PATH"].ends_with("depot_tools"));
    }

    #[test]
    fn test_package_layout_by_linkage() {
        let recipe = V8Recipe::new().unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));

        let ctx = configure(&recipe, "11.6.189.19", &linux_gcc9()).unwrap();
        assert!(recipe
            .required_artifacts(&ctx)
            .contains(&"lib/libv8_monolith.a".to_string()));
        let manifest = recipe.package_info(&ctx, Path::new("/p")).unwrap();
        assert_eq!(manifest.cpp_info.libs, vec!["v8_monolith"]);
        assert_eq!(manifest.cpp_info.system_libs, vec!["pthread", "dl", "atomic"]);
        assert_eq!(manifest.cpp_info.defines, vec!["V8_GN_HEADER=1"]);

        let mut p = linux_gcc9();
        p.set_option("shared=True").unwrap();
        let ctx = configure(&recipe, "11.6.189.19", &p).unwrap();
        let manifest = recipe.package_info(&ctx, Path::new("/p")).unwrap();
        assert_eq!(manifest.cpp_info.libs, vec!["v8", "v8_libplatform"]);
        let steps = recipe.build_steps(&ctx, &layout, &GeneratorArgs::new(), 4);
        match steps.last() {
            Some(Step::Run(inv)) => assert!(!inv.args.contains(&"v8_monolith".to_string())),
            other => panic!("unexpected last step {:?}", other),
        }
    }
}
