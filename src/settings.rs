// src/settings.rs

//! Target settings: operating system, architecture, compiler and build type
//!
//! Settings are the fixed identity of the platform a package is built for.
//! Unlike options they are never removed or overridden by recipes; recipes
//! only read them (through [`Target`]) to decide what to do.

use crate::error::{Error, Result};
use crate::version::Version;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Os {
    Linux,
    Windows,
    Macos,
    FreeBSD,
    #[strum(serialize = "iOS")]
    Ios,
    Android,
}

impl Os {
    /// The operating system this binary runs on
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            "freebsd" => Os::FreeBSD,
            "ios" => Os::Ios,
            "android" => Os::Android,
            _ => Os::Linux,
        }
    }

    pub fn is_apple(&self) -> bool {
        matches!(self, Os::Macos | Os::Ios)
    }
}

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Arch {
    #[strum(serialize = "x86")]
    X86,
    #[strum(serialize = "x86_64")]
    X86_64,
    #[strum(serialize = "armv7")]
    Armv7,
    #[strum(serialize = "armv8")]
    Armv8,
}

impl Arch {
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "arm" => Arch::Armv7,
            "aarch64" => Arch::Armv8,
            _ => Arch::X86_64,
        }
    }
}

/// Compiler family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum CompilerKind {
    #[strum(serialize = "gcc")]
    Gcc,
    #[strum(serialize = "clang")]
    Clang,
    #[strum(serialize = "apple-clang")]
    AppleClang,
    #[strum(serialize = "msvc")]
    Msvc,
}

impl CompilerKind {
    /// Whether this compiler is a clang flavor
    pub fn is_clang(&self) -> bool {
        matches!(self, CompilerKind::Clang | CompilerKind::AppleClang)
    }
}

/// Build type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

/// Compiler identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub kind: CompilerKind,
    pub version: Version,
    /// C++ standard library flavor (libstdc++, libstdc++11, libc++, ...)
    pub libcxx: Option<String>,
    /// MSVC runtime linkage: "static" or "dynamic"
    pub runtime: Option<String>,
    /// MSVC runtime flavor: "Debug" or "Release"
    pub runtime_type: Option<String>,
}

impl Compiler {
    pub fn new(kind: CompilerKind, version: Version) -> Self {
        Self {
            kind,
            version,
            libcxx: None,
            runtime: None,
            runtime_type: None,
        }
    }

    /// The C++ standard library in effect, falling back to the family default
    pub fn libcxx(&self) -> Option<&str> {
        if let Some(libcxx) = &self.libcxx {
            return Some(libcxx.as_str());
        }
        match self.kind {
            CompilerKind::Gcc | CompilerKind::Clang => Some("libstdc++11"),
            CompilerKind::AppleClang => Some("libc++"),
            CompilerKind::Msvc => None,
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.version)
    }
}

/// The platform a package is built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: Compiler,
    pub build_type: BuildType,
    /// Settings of the machine running the build, when different from the target
    pub build_machine: Option<(Os, Arch)>,
}

impl Settings {
    pub fn new(os: Os, arch: Arch, compiler: Compiler, build_type: BuildType) -> Self {
        Self {
            os,
            arch,
            compiler,
            build_type,
            build_machine: None,
        }
    }

    /// Parse settings from `key -> value` pairs
    ///
    /// Recognized keys: `os`, `arch`, `compiler`, `compiler.version`,
    /// `compiler.libcxx`, `compiler.runtime`, `compiler.runtime_type`,
    /// `build_type`. Unset `os`/`arch` default to the host; the compiler and
    /// its version must be given.
    pub fn from_map(
        values: &BTreeMap<String, String>,
        build_values: &BTreeMap<String, String>,
    ) -> Result<Self> {
        for key in values.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                return Err(Error::ConfigurationError(format!("Unknown setting '{}'", key)));
            }
        }

        let os = match values.get("os") {
            Some(v) => parse_setting::<Os>("os", v)?,
            None => Os::host(),
        };
        let arch = match values.get("arch") {
            Some(v) => parse_setting::<Arch>("arch", v)?,
            None => Arch::host(),
        };
        let kind = values
            .get("compiler")
            .ok_or_else(|| Error::ConfigurationError("Setting 'compiler' is required".to_string()))
            .and_then(|v| parse_setting::<CompilerKind>("compiler", v))?;
        let version = values
            .get("compiler.version")
            .ok_or_else(|| {
                Error::ConfigurationError("Setting 'compiler.version' is required".to_string())
            })
            .and_then(|v| {
                Version::parse(v).map_err(|e| {
                    Error::ConfigurationError(format!("Invalid compiler.version '{}': {}", v, e))
                })
            })?;
        let build_type = match values.get("build_type") {
            Some(v) => parse_setting::<BuildType>("build_type", v)?,
            None => BuildType::default(),
        };

        let mut compiler = Compiler::new(kind, version);
        compiler.libcxx = values.get("compiler.libcxx").cloned();
        compiler.runtime = values.get("compiler.runtime").cloned();
        compiler.runtime_type = values.get("compiler.runtime_type").cloned();

        if let Some(runtime) = &compiler.runtime
            && runtime != "static"
            && runtime != "dynamic"
        {
            return Err(Error::ConfigurationError(format!(
                "Invalid compiler.runtime '{}' (expected static or dynamic)",
                runtime
            )));
        }

        let build_machine = if build_values.is_empty() {
            None
        } else {
            let build_os = match build_values.get("os") {
                Some(v) => parse_setting::<Os>("os", v)?,
                None => Os::host(),
            };
            let build_arch = match build_values.get("arch") {
                Some(v) => parse_setting::<Arch>("arch", v)?,
                None => Arch::host(),
            };
            Some((build_os, build_arch))
        };

        Ok(Self {
            os,
            arch,
            compiler,
            build_type,
            build_machine,
        })
    }

    /// Flatten back to `key -> value` pairs (stable order)
    pub fn as_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("os".to_string(), self.os.to_string());
        map.insert("arch".to_string(), self.arch.to_string());
        map.insert("compiler".to_string(), self.compiler.kind.to_string());
        map.insert("compiler.version".to_string(), self.compiler.version.to_string());
        if let Some(libcxx) = &self.compiler.libcxx {
            map.insert("compiler.libcxx".to_string(), libcxx.clone());
        }
        if let Some(runtime) = &self.compiler.runtime {
            map.insert("compiler.runtime".to_string(), runtime.clone());
        }
        if let Some(runtime_type) = &self.compiler.runtime_type {
            map.insert("compiler.runtime_type".to_string(), runtime_type.clone());
        }
        map.insert("build_type".to_string(), self.build_type.to_string());
        map
    }

    pub fn is_apple_os(&self) -> bool {
        self.os.is_apple()
    }

    pub fn is_msvc(&self) -> bool {
        self.compiler.kind == CompilerKind::Msvc
    }

    pub fn is_debug(&self) -> bool {
        self.build_type == BuildType::Debug
    }

    /// True when the build machine differs from the target
    pub fn cross_building(&self) -> bool {
        self.build_machine
            .is_some_and(|(os, arch)| os != self.os || arch != self.arch)
    }

    /// Whether MSVC links the static C runtime
    pub fn is_msvc_static_runtime(&self) -> bool {
        self.is_msvc() && self.compiler.runtime.as_deref() == Some("static")
    }

    /// MSVC runtime flag: MT, MTd, MD or MDd. None for other compilers.
    pub fn msvc_runtime_flag(&self) -> Option<&'static str> {
        if !self.is_msvc() {
            return None;
        }
        let debug = match self.compiler.runtime_type.as_deref() {
            Some(t) => t.eq_ignore_ascii_case("debug"),
            None => self.is_debug(),
        };
        Some(match (self.is_msvc_static_runtime(), debug) {
            (true, false) => "MT",
            (true, true) => "MTd",
            (false, false) => "MD",
            (false, true) => "MDd",
        })
    }

    /// Name of the C++ standard library consumers must link statically
    /// built packages against, if any
    pub fn stdcpp_library(&self) -> Option<&'static str> {
        match self.compiler.libcxx()? {
            "libstdc++" | "libstdc++11" => Some("stdc++"),
            "libc++" => Some("c++"),
            "c++_shared" => Some("c++_shared"),
            "c++_static" => Some("c++_static"),
            _ => None,
        }
    }
}

/// Settings plus the recipe version being built
///
/// This is everything a rule condition may inspect apart from options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub settings: Settings,
    pub version: Version,
}

impl Target {
    pub fn new(settings: Settings, version: Version) -> Self {
        Self { settings, version }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "os",
    "arch",
    "compiler",
    "compiler.version",
    "compiler.libcxx",
    "compiler.runtime",
    "compiler.runtime_type",
    "build_type",
];

fn parse_setting<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr + IntoEnumIterator + fmt::Display,
{
    value.parse::<T>().map_err(|_| {
        let legal: Vec<String> = T::iter().map(|v| v.to_string()).collect();
        Error::ConfigurationError(format!(
            "Invalid value '{}' for setting '{}' (possible values: {})",
            value,
            key,
            legal.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_map() {
        let settings = Settings::from_map(
            &map(&[
                ("os", "Linux"),
                ("arch", "x86_64"),
                ("compiler", "gcc"),
                ("compiler.version", "9"),
                ("build_type", "Debug"),
            ]),
            &BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(settings.os, Os::Linux);
        assert_eq!(settings.arch, Arch::X86_64);
        assert_eq!(settings.compiler.kind, CompilerKind::Gcc);
        assert!(settings.compiler.version == "9");
        assert!(settings.is_debug());
        assert!(!settings.cross_building());
    }

    #[test]
    fn test_compiler_required() {
        let err = Settings::from_map(&map(&[("os", "Linux")]), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_map(
            &map(&[("compiler", "gcc"), ("compiler.version", "9"), ("color", "red")]),
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn test_names_roundtrip() {
        assert_eq!("apple-clang".parse::<CompilerKind>().unwrap(), CompilerKind::AppleClang);
        assert_eq!(CompilerKind::AppleClang.to_string(), "apple-clang");
        assert_eq!("armv8".parse::<Arch>().unwrap(), Arch::Armv8);
        assert_eq!("windows".parse::<Os>().unwrap(), Os::Windows);
        assert_eq!(Os::Macos.to_string(), "Macos");
    }

    #[test]
    fn test_msvc_runtime_flag() {
        let mut s = Settings::from_map(
            &map(&[
                ("os", "Windows"),
                ("compiler", "msvc"),
                ("compiler.version", "193"),
                ("compiler.runtime", "static"),
            ]),
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(s.is_msvc_static_runtime());
        assert_eq!(s.msvc_runtime_flag(), Some("MT"));

        s.compiler.runtime = Some("dynamic".to_string());
        s.build_type = BuildType::Debug;
        assert_eq!(s.msvc_runtime_flag(), Some("MDd"));
    }

    #[test]
    fn test_stdcpp_library() {
        let mut s = Settings::new(
            Os::Linux,
            Arch::X86_64,
            Compiler::new(CompilerKind::Gcc, Version::parse("9").unwrap()),
            BuildType::Release,
        );
        assert_eq!(s.stdcpp_library(), Some("stdc++"));

        s.compiler.libcxx = Some("libc++".to_string());
        assert_eq!(s.stdcpp_library(), Some("c++"));

        s.compiler = Compiler::new(CompilerKind::Msvc, Version::parse("193").unwrap());
        assert_eq!(s.stdcpp_library(), None);
    }

    #[test]
    fn test_cross_building() {
        let s = Settings::from_map(
            &map(&[("os", "Linux"), ("arch", "armv8"), ("compiler", "gcc"), ("compiler.version", "9")]),
            &map(&[("os", "Linux"), ("arch", "x86_64")]),
        )
        .unwrap();
        assert!(s.cross_building());
    }
}
