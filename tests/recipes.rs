// tests/recipes.rs

//! Built-in recipe resolution across target platforms.

mod common;

use common::{linux_gcc_profile, windows_msvc_profile};
use std::path::Path;
use stockpot::cookbook;
use stockpot::{Error, Kitchen, KitchenConfig, Layout, configure};
use tempfile::TempDir;

fn layout() -> Layout {
    Layout::under(Path::new("/work"), Path::new("/pkg"))
}

#[test]
fn test_proj_linux_static_with_tiff_and_curl() {
    let recipe = cookbook::find("proj").unwrap();
    let ctx = configure(recipe.as_ref(), "9.1.0", &linux_gcc_profile("11", "")).unwrap();

    let args = recipe.generator_args(&ctx, &layout()).unwrap();
    assert_eq!(args.get_last("BUILD_SHARED_LIBS"), Some("OFF"));
    assert_eq!(args.get_last("ENABLE_TIFF"), Some("ON"));
    assert_eq!(args.get_last("ENABLE_CURL"), Some("ON"));
    assert_eq!(args.get_last("CMAKE_POSITION_INDEPENDENT_CODE"), Some("ON"));

    let pkg = TempDir::new().unwrap();
    let manifest = recipe.package_info(&ctx, pkg.path()).unwrap();
    let system_libs = &manifest.cpp_info.system_libs;
    assert!(system_libs.contains(&"m".to_string()));
    assert!(system_libs.contains(&"pthread".to_string()));
    assert!(system_libs.contains(&"stdc++".to_string()));
    assert!(manifest.cpp_info.defines.contains(&"PROJ_DLL=".to_string()));
    assert_eq!(manifest.properties.get("cmake_target_name").unwrap(), "PROJ::proj");
}

#[test]
fn test_proj_windows_drops_fpic_even_when_requested() {
    let recipe = cookbook::find("proj").unwrap();
    let mut profile = windows_msvc_profile("193");
    profile.set_option("fPIC=True").unwrap();

    let ctx = configure(recipe.as_ref(), "9.1.0", &profile).unwrap();
    assert!(!ctx.config.contains("fPIC"));

    let args = recipe.generator_args(&ctx, &layout()).unwrap();
    assert_eq!(args.get_last("CMAKE_POSITION_INDEPENDENT_CODE"), None);
    assert_eq!(args.get_last("CMAKE_C_COMPILER"), None);
}

#[test]
fn test_proj_scoped_option_override() {
    let recipe = cookbook::find("proj").unwrap();
    let mut profile = linux_gcc_profile("11", "");
    profile.set_option("proj:shared=True").unwrap();
    profile.set_option("v8:with_curl=False").unwrap();

    let ctx = configure(recipe.as_ref(), "9.1.0", &profile).unwrap();
    assert!(ctx.option("shared"));
    assert!(!ctx.config.contains("fPIC"));
    assert!(ctx.option("with_curl"));
}

#[test]
fn test_proj_unknown_version_is_rejected() {
    let recipe = cookbook::find("proj").unwrap();
    let err = configure(recipe.as_ref(), "5.0.0", &linux_gcc_profile("11", "")).unwrap_err();
    assert!(matches!(err, Error::ConfigurationError(_)));
}

#[test]
fn test_proj_invalid_option_value_is_rejected() {
    let recipe = cookbook::find("proj").unwrap();
    let mut profile = linux_gcc_profile("11", "");
    profile.set_option("shared=maybe").unwrap();

    let err = configure(recipe.as_ref(), "9.1.0", &profile).unwrap_err();
    assert!(matches!(err, Error::ConfigurationError(_)));
}

#[test]
fn test_configuration_is_deterministic() {
    for name in cookbook::RECIPES {
        let recipe = cookbook::find(name).unwrap();
        let version = recipe.data().versions().last().unwrap().to_string();
        let profile = linux_gcc_profile("9", "");

        let first = configure(recipe.as_ref(), &version, &profile).unwrap();
        let second = configure(recipe.as_ref(), &version, &profile).unwrap();
        assert_eq!(first.config, second.config, "{}", name);

        let a = recipe.generator_args(&first, &layout()).unwrap();
        let b = recipe.generator_args(&second, &layout()).unwrap();
        assert_eq!(a, b, "{}", name);
        assert_eq!(a.to_gn(), b.to_gn(), "{}", name);
    }
}

#[test]
fn test_v8_rejects_gcc_12_before_fetch() {
    let recipe = cookbook::find("v8").unwrap();
    let err = configure(recipe.as_ref(), "11.6.189.19", &linux_gcc_profile("12", "")).unwrap_err();
    assert!(matches!(err, Error::ConfigurationError(_)));
    assert!(err.to_string().contains("gcc 9"));
}

#[test]
fn test_v8_windows_shared_rejected() {
    let recipe = cookbook::find("v8").unwrap();
    let mut profile = windows_msvc_profile("193");
    profile.set_option("shared=True").unwrap();

    let err = configure(recipe.as_ref(), "11.6.189.19", &profile).unwrap_err();
    assert!(matches!(err, Error::ConfigurationError(_)));
}

#[test]
fn test_v8_windows_msvc_plan() {
    let recipe = cookbook::find("v8").unwrap();
    let ctx = configure(recipe.as_ref(), "11.6.189.19", &windows_msvc_profile("193")).unwrap();
    assert!(!ctx.config.contains("fPIC"));

    let kitchen = Kitchen::new(KitchenConfig {
        jobs: 4,
        ..KitchenConfig::default()
    });
    let plan = kitchen.plan(recipe.as_ref(), &ctx).unwrap();
    assert_eq!(plan.generator_args.get_last("target_os"), Some("\"win\""));
    assert_eq!(plan.generator_args.get_last("is_clang"), Some("false"));
    assert_eq!(plan.generator_args.get_last("v8_monolithic"), Some("true"));
    assert!(plan.tools.contains(&"ninja".to_string()));
    assert!(!plan.tools.contains(&"bison".to_string()));
    assert_eq!(plan.jobs, 4);
}

#[test]
fn test_v8_memory_ceiling_limits_jobs() {
    let recipe = cookbook::find("v8").unwrap();
    let mut profile = linux_gcc_profile("9", "");
    profile.set_option("is_debug=True").unwrap();
    let ctx = configure(recipe.as_ref(), "11.6.189.19", &profile).unwrap();

    let kitchen = Kitchen::new(KitchenConfig {
        jobs: 16,
        max_ram_gb: Some(8.0),
        ..KitchenConfig::default()
    });
    assert_eq!(kitchen.jobs_for(recipe.as_ref(), &ctx).unwrap(), 4);
}
