// src/cookbook/proj.rs

//! PROJ: cartographic projections and coordinate transformations
//!
//! Built with CMake against external nlohmann_json and SQLite3, optionally
//! libtiff and libcurl.

use super::{base_manifest, embedded};
use crate::env::EnvOverlay;
use crate::error::Result;
use crate::generator::{GeneratorArgs, cmake_bool};
use crate::manifest::{PackageManifest, collect_libs};
use crate::options::{Condition, OptionDecl, Rule};
use crate::recipe::{
    BuildContext, CopyRule, Invocation, Layout, PatchOp, Recipe, RecipeData, RecipeInfo, Step,
};
use crate::settings::{CompilerKind, Os};
use std::path::Path;

const DATA: &str = include_str!("../../recipes/proj/recipe.toml");

pub struct ProjRecipe {
    data: RecipeData,
}

impl ProjRecipe {
    pub fn new() -> Result<Self> {
        Ok(Self::with_data(embedded("proj", DATA)?))
    }

    pub fn with_data(data: RecipeData) -> Self {
        Self { data }
    }

    fn build_executables(ctx: &BuildContext) -> bool {
        ctx.option("build_executables")
    }

    /// `--config` for multi-config generators
    fn config_args(ctx: &BuildContext) -> Vec<String> {
        if ctx.settings().is_msvc() {
            vec!["--config".to_string(), ctx.settings().build_type.to_string()]
        } else {
            Vec::new()
        }
    }
}

impl Recipe for ProjRecipe {
    fn info(&self) -> RecipeInfo {
        RecipeInfo {
            name: "proj",
            description: "Cartographic Projections and Coordinate Transformations Library.",
            license: "MIT",
            homepage: "https://proj.org",
        }
    }

    fn data(&self) -> &RecipeData {
        &self.data
    }

    fn options(&self) -> Vec<OptionDecl> {
        vec![
            OptionDecl::boolean("shared", false),
            OptionDecl::boolean("fPIC", true),
            OptionDecl::boolean("threadsafe", true),
            OptionDecl::boolean("with_tiff", true),
            OptionDecl::boolean("with_curl", true),
            OptionDecl::boolean("build_executables", true),
        ]
    }

    fn rules(&self) -> Result<Vec<Rule>> {
        let pre_7 = Condition::version("<7.0.0")?;
        Ok(vec![
            Rule::remove(Condition::os(Os::Windows), "fPIC"),
            Rule::remove(pre_7.clone(), "with_tiff"),
            Rule::remove(pre_7, "with_curl"),
            Rule::remove(Condition::option("shared"), "fPIC"),
        ])
    }

    fn requires(&self, ctx: &BuildContext) -> Vec<String> {
        let mut requires = vec![
            "nlohmann_json/3.11.2".to_string(),
            "sqlite3/3.39.4".to_string(),
        ];
        if ctx.option("with_tiff") {
            requires.push("libtiff/4.4.0".to_string());
        }
        if ctx.option("with_curl") {
            requires.push("libcurl/7.85.0".to_string());
        }
        requires
    }

    fn tool_requires(&self, ctx: &BuildContext) -> Vec<String> {
        if ctx.settings().cross_building() {
            vec!["sqlite3/3.39.4".to_string()]
        } else {
            Vec::new()
        }
    }

    fn tools(&self, _ctx: &BuildContext) -> Vec<String> {
        vec!["cmake".to_string()]
    }

    fn patches(&self, ctx: &BuildContext, layout: &Layout) -> Result<Vec<PatchOp>> {
        let src = &layout.source_dir;
        let cmakelists = src.join("CMakeLists.txt");

        let mut ops = vec![
            PatchOp::replace("drop /W4 from MSVC flags", &cmakelists, "/W4", ""),
            PatchOp::remove_file(
                "use CMake's SQLite3 finder",
                &src.join("cmake").join("FindSqlite3.cmake"),
            ),
            PatchOp::replace(
                "rename SQLITE3_FOUND",
                &cmakelists,
                "SQLITE3_FOUND",
                "SQLite3_FOUND",
            ),
            PatchOp::replace(
                "rename SQLITE3_VERSION",
                &cmakelists,
                "SQLITE3_VERSION",
                "SQLite3_VERSION",
            ),
            PatchOp::replace(
                "find SQLite3 in module mode",
                &cmakelists,
                "find_package(Sqlite3 REQUIRED)",
                "find_package(SQLite3 REQUIRED MODULE)",
            ),
            PatchOp::replace(
                "install with a clean rpath",
                &cmakelists,
                "set(CMAKE_INSTALL_RPATH_USE_LINK_PATH TRUE)",
                "",
            )
            .when(Condition::version(">=7.1.0, <9.0.0")?),
        ];

        // SIP strips DYLD_* from the environment of the sqlite3 tool that
        // builds proj.db, so pass the library path on its command line.
        let lib_paths = ctx
            .dependencies
            .get("sqlite3")
            .map(|dep| dep.lib_dirs.join(":"))
            .unwrap_or_default();
        let apple_native = Condition::Os(vec![Os::Macos, Os::Ios]).and(!Condition::CrossBuilding);
        for (constraint, file, pattern) in [
            ("<8.1.0", "CMakeLists.txt", "${EXE_SQLITE3}"),
            (">=8.1.0", "generate_proj_db.cmake", "\"${EXE_SQLITE3}\""),
        ] {
            ops.push(
                PatchOp::replace(
                    "run sqlite3 with DYLD_LIBRARY_PATH",
                    &src.join("data").join(file),
                    &format!("COMMAND {}", pattern),
                    &format!(
                        "COMMAND ${{CMAKE_COMMAND}} -E env \"DYLD_LIBRARY_PATH={}\" {}",
                        lib_paths, pattern
                    ),
                )
                .when(apple_native.clone().and(Condition::version(constraint)?)),
            );
        }

        ops.push(
            PatchOp::remove_dir(
                "unvendor nlohmann_json",
                &src.join("include").join("proj").join("internal").join("nlohmann"),
            )
            .when(Condition::version("<8.1.0")?),
        );

        Ok(ops)
    }

    fn generator_args(&self, ctx: &BuildContext, _layout: &Layout) -> Result<GeneratorArgs> {
        let settings = ctx.settings();
        let version = ctx.version();
        let executables = Self::build_executables(ctx);
        let mut args = GeneratorArgs::new();

        args.push("CMAKE_BUILD_TYPE", settings.build_type.to_string())
            .push("BUILD_SHARED_LIBS", cmake_bool(ctx.option("shared")));
        if ctx.config.contains("fPIC") {
            args.push("CMAKE_POSITION_INDEPENDENT_CODE", cmake_bool(ctx.option("fPIC")));
        }
        if settings.compiler.kind != CompilerKind::Msvc {
            args.push("CMAKE_C_COMPILER", ctx.toolchain.cc.as_str())
                .push("CMAKE_CXX_COMPILER", ctx.toolchain.cxx.as_str());
        }

        args.push("USE_THREAD", cmake_bool(ctx.option("threadsafe")));
        for tool in ["CCT", "CS2CS", "GEOD", "GIE", "PROJ", "PROJINFO"] {
            args.push(&format!("BUILD_{}", tool), cmake_bool(executables));
        }
        args.push("PROJ_DATA_SUBDIR", "res");

        if *version < "7.0.0" {
            args.push("PROJ_TESTS", cmake_bool(false))
                .push("BUILD_LIBPROJ_SHARED", cmake_bool(ctx.option("shared")))
                .push("ENABLE_LTO", cmake_bool(false))
                .push("JNI_SUPPORT", cmake_bool(false));
        } else {
            args.push("ENABLE_TIFF", cmake_bool(ctx.option("with_tiff")))
                .push("ENABLE_CURL", cmake_bool(ctx.option("with_curl")))
                .push("BUILD_TESTING", cmake_bool(false))
                .push("ENABLE_IPO", cmake_bool(false))
                .push(
                    "BUILD_PROJSYNC",
                    cmake_bool(executables && ctx.option("with_curl")),
                );
        }
        if *version >= "8.1.0" {
            args.push("NLOHMANN_JSON_ORIGIN", "external");
        }
        args.push("CMAKE_MACOSX_BUNDLE", cmake_bool(false))
            .push("CMAKE_POLICY_DEFAULT_CMP0077", "NEW");

        Ok(args)
    }

    fn build_steps(
        &self,
        ctx: &BuildContext,
        layout: &Layout,
        args: &GeneratorArgs,
        jobs: u32,
    ) -> Vec<Step> {
        let src = layout.source_dir.to_string_lossy().into_owned();
        let build = layout.build_dir.to_string_lossy().into_owned();
        let jobs = jobs.to_string();

        let configure = Invocation::new("cmake", &layout.build_dir)
            .args(["-S", src.as_str(), "-B", build.as_str()])
            .args(args.to_cmake_defines());
        let compile = Invocation::new("cmake", &layout.build_dir)
            .args(["--build", build.as_str(), "--parallel", jobs.as_str()])
            .args(Self::config_args(ctx));

        vec![Step::Run(configure), Step::Run(compile)]
    }

    fn package_steps(&self, ctx: &BuildContext, layout: &Layout) -> Vec<Step> {
        let pkg = &layout.package_dir;
        let build = layout.build_dir.to_string_lossy().into_owned();
        let prefix = pkg.to_string_lossy().into_owned();

        let install = Invocation::new("cmake", &layout.build_dir)
            .args(["--install", build.as_str(), "--prefix", prefix.as_str()])
            .args(Self::config_args(ctx));

        vec![
            Step::Copy(CopyRule::new(
                "COPYING",
                &layout.source_dir,
                &pkg.join("licenses"),
                false,
            )),
            Step::Run(install),
            Step::RemoveDir(pkg.join("share")),
            Step::RemoveDir(pkg.join("lib").join("cmake")),
            Step::RemoveDir(pkg.join("lib").join("pkgconfig")),
        ]
    }

    fn required_artifacts(&self, _ctx: &BuildContext) -> Vec<String> {
        vec!["licenses/COPYING".to_string(), "lib/*proj*".to_string()]
    }

    fn package_info(&self, ctx: &BuildContext, package_dir: &Path) -> Result<PackageManifest> {
        let settings = ctx.settings();
        let version = ctx.version();
        let shared = ctx.option("shared");
        let mut manifest = base_manifest(self, ctx);

        let (file_name, namespace) = if *version >= "7.0.0" {
            ("proj", "PROJ")
        } else {
            ("proj4", "PROJ4")
        };
        manifest.set_property("cmake_file_name", file_name);
        manifest.set_property("cmake_target_name", format!("{}::proj", namespace));
        manifest.set_property("pkg_config_name", "proj");

        let cpp = &mut manifest.cpp_info;
        cpp.libs = collect_libs(&package_dir.join("lib"))?;

        match settings.os {
            Os::Linux | Os::FreeBSD => {
                cpp.system_libs.push("m".to_string());
                if ctx.option("threadsafe") {
                    cpp.system_libs.push("pthread".to_string());
                }
            }
            Os::Windows => {
                if *version >= "7.0.0" {
                    cpp.system_libs.push("shell32".to_string());
                }
                if *version >= "7.1.0" {
                    cpp.system_libs.push("Ole32".to_string());
                }
            }
            _ => {}
        }
        if !shared && let Some(stdcpp) = settings.stdcpp_library() {
            cpp.system_libs.push(stdcpp.to_string());
        }

        cpp.requires = vec![
            "nlohmann_json::nlohmann_json".to_string(),
            "sqlite3::sqlite3".to_string(),
        ];
        if ctx.option("with_tiff") {
            cpp.requires.push("libtiff::libtiff".to_string());
        }
        if ctx.option("with_curl") {
            cpp.requires.push("libcurl::libcurl".to_string());
        }

        if *version < "8.2.0" {
            if shared && settings.is_msvc() {
                cpp.defines.push("PROJ_MSVC_DLL_IMPORT".to_string());
            }
        } else if !shared {
            cpp.defines.push("PROJ_DLL=".to_string());
        }

        let res = package_dir.join("res").to_string_lossy().into_owned();
        let mut runenv = EnvOverlay::new();
        runenv.prepend_path("PROJ_LIB", res.as_str());
        manifest.runenv = runenv;

        if Self::build_executables(ctx) {
            let bin = package_dir.join("bin").to_string_lossy().into_owned();
            manifest
                .buildenv
                .prepend_path("PROJ_LIB", res)
                .append_path("PATH", bin);
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvOp;
    use crate::profile::Profile;
    use crate::recipe::configure;

    fn profile(extra: &str) -> Profile {
        Profile::parse(&format!(
            "[settings]\nos = \"Linux\"\narch = \"x86_64\"\ncompiler = \"gcc\"\n\"compiler.version\" = \"11\"\nbuild_type = \"Release\"\n{}",
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_defaults_linux() {
        let recipe = ProjRecipe::new().unwrap();
        let ctx = configure(&recipe, "9.1.0", &profile("")).unwrap();
        assert!(ctx.option("fPIC"));
        assert!(ctx.option("with_tiff"));
        assert_eq!(
            recipe.requires(&ctx),
            vec![
                "nlohmann_json/3.11.2",
                "sqlite3/3.39.4",
                "libtiff/4.4.0",
                "libcurl/7.85.0"
            ]
        );
        assert_eq!(recipe.tools(&ctx), vec!["cmake"]);
    }

    #[test]
    fn test_old_version_drops_tiff_and_curl() {
        let recipe = ProjRecipe::new().unwrap();
        let ctx = configure(&recipe, "6.3.1", &profile("")).unwrap();
        assert!(!ctx.config.contains("with_tiff"));
        assert!(!ctx.config.contains("with_curl"));

        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let args = recipe.generator_args(&ctx, &layout).unwrap();
        assert_eq!(args.get_last("PROJ_TESTS"), Some("OFF"));
        assert_eq!(args.get_last("ENABLE_TIFF"), None);
        assert_eq!(args.get_last("NLOHMANN_JSON_ORIGIN"), None);
        assert_eq!(recipe.requires(&ctx).len(), 2);
    }

    #[test]
    fn test_projsync_needs_curl() {
        let recipe = ProjRecipe::new().unwrap();
        let mut p = profile("");
        p.set_option("with_curl=False").unwrap();
        let ctx = configure(&recipe, "9.1.0", &p).unwrap();

        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let args = recipe.generator_args(&ctx, &layout).unwrap();
        assert_eq!(args.get_last("BUILD_PROJSYNC"), Some("OFF"));
        assert_eq!(args.get_last("BUILD_PROJ"), Some("ON"));
        assert_eq!(args.get_last("NLOHMANN_JSON_ORIGIN"), Some("external"));
    }

    #[test]
    fn test_patch_conditions_by_version() {
        let recipe = ProjRecipe::new().unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));

        let ctx = configure(&recipe, "9.1.0", &profile("")).unwrap();
        let ops = recipe.patches(&ctx, &layout).unwrap();
        let applying: Vec<&str> = ops
            .iter()
            .filter(|op| op.applies(&ctx.target, &ctx.config))
            .map(|op| op.description.as_str())
            .collect();
        assert!(!applying.contains(&"install with a clean rpath"));
        assert!(!applying.contains(&"unvendor nlohmann_json"));
        assert!(!applying.contains(&"run sqlite3 with DYLD_LIBRARY_PATH"));

        let ctx = configure(&recipe, "8.0.1", &profile("")).unwrap();
        let ops = recipe.patches(&ctx, &layout).unwrap();
        let applying: Vec<&str> = ops
            .iter()
            .filter(|op| op.applies(&ctx.target, &ctx.config))
            .map(|op| op.description.as_str())
            .collect();
        assert!(applying.contains(&"install with a clean rpath"));
        assert!(applying.contains(&"unvendor nlohmann_json"));
    }

    #[test]
    fn test_macos_sqlite_wrapper() {
        let recipe = ProjRecipe::new().unwrap();
        let p = Profile::parse(
            r#"
[settings]
os = "Macos"
arch = "armv8"
compiler = "apple-clang"
"compiler.version" = "14"

[dependencies.sqlite3]
lib_dirs = ["/opt/sqlite/lib", "/opt/extra/lib"]
"#,
        )
        .unwrap();
        let ctx = configure(&recipe, "9.1.0", &p).unwrap();
        let layout = Layout::under(Path::new("/w"), Path::new("/p"));
        let ops = recipe.patches(&ctx, &layout).unwrap();

        let wrappers: Vec<&PatchOp> = ops
            .iter()
            .filter(|op| op.applies(&ctx.target, &ctx.config))
            .filter(|op| op.description == "run sqlite3 with DYLD_LIBRARY_PATH")
            .collect();
        assert_eq!(wrappers.len(), 1);
        match &wrappers[0].action {
            crate::recipe::PatchAction::Replace { file, from, to } => {
                assert!(file.ends_with("data/generate_proj_db.cmake"));
                assert_eq!(from, "COMMAND \"${EXE_SQLITE3}\"");
                assert_eq!(
                    to,
                    "COMMAND ${CMAKE_COMMAND} -E env \"DYLD_LIBRARY_PATH=/opt/sqlite/lib:/opt/extra/lib\" \"${EXE_SQLITE3}\""
                );
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_package_info_windows_shared() {
        let recipe = ProjRecipe::new().unwrap();
        let mut p = Profile::parse(
            r#"
[settings]
os = "Windows"
arch = "x86_64"
compiler = "msvc"
"compiler.version" = "193"
"compiler.runtime" = "dynamic"
"#,
        )
        .unwrap();
        p.set_option("shared=True").unwrap();
        let ctx = configure(&recipe, "8.1.1", &p).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/proj.lib"), b"").unwrap();

        let manifest = recipe.package_info(&ctx, dir.path()).unwrap();
        assert_eq!(manifest.cpp_info.libs, vec!["proj"]);
        assert_eq!(manifest.cpp_info.system_libs, vec!["shell32", "Ole32"]);
        assert_eq!(manifest.cpp_info.defines, vec!["PROJ_MSVC_DLL_IMPORT"]);
        assert!(!manifest.options.contains_key("fPIC"));
        assert_eq!(manifest.properties["cmake_target_name"], "PROJ::proj");
    }

    #[test]
    fn test_package_environment() {
        let recipe = ProjRecipe::new().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let res = dir.path().join("res").to_string_lossy().into_owned();
        let bin = dir.path().join("bin").to_string_lossy().into_owned();

        let ctx = configure(&recipe, "9.1.0", &profile("")).unwrap();
        let manifest = recipe.package_info(&ctx, dir.path()).unwrap();
        assert_eq!(
            manifest.runenv.ops(),
            &[EnvOp::Prepend {
                name: "PROJ_LIB".to_string(),
                value: res.clone(),
            }]
        );
        assert_eq!(
            manifest.buildenv.ops(),
            &[
                EnvOp::Prepend {
                    name: "PROJ_LIB".to_string(),
                    value: res.clone(),
                },
                EnvOp::Append {
                    name: "PATH".to_string(),
                    value: bin,
                },
            ]
        );

        let mut p = profile("");
        p.set_option("build_executables=False").unwrap();
        let ctx = configure(&recipe, "9.1.0", &p).unwrap();
        let manifest = recipe.package_info(&ctx, dir.path()).unwrap();
        assert_eq!(manifest.runenv.ops().len(), 1);
        assert!(manifest.buildenv.is_empty());
    }

    #[test]
    fn test_package_info_linux_shared() {
        let recipe = ProjRecipe::new().unwrap();
        let mut p = profile("");
        p.set_option("shared=True").unwrap();
        let ctx = configure(&recipe, "9.1.0", &p).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/libproj.so"), b"").unwrap();

        let manifest = recipe.package_info(&ctx, dir.path()).unwrap();
        assert_eq!(manifest.cpp_info.libs, vec!["proj"]);
        assert_eq!(manifest.cpp_info.system_libs, vec!["m", "pthread"]);
        assert!(manifest.cpp_info.defines.is_empty());
    }
}
