// src/generator.rs

//! Generator arguments
//!
//! The ordered key/value list handed verbatim to the native generator,
//! rendered as CMake `-D` definitions or as GN `args.gn` lines. Order is
//! preserved and duplicate keys are kept.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorArg {
    pub key: String,
    pub value: String,
}

impl fmt::Display for GeneratorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratorArgs {
    args: Vec<GeneratorArg>,
}

impl GeneratorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.args.push(GeneratorArg {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    /// The last value given for `key`
    pub fn get_last(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorArg> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// `-DKEY=VALUE` arguments for `cmake`
    pub fn to_cmake_defines(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| format!("-D{}={}", a.key, a.value))
            .collect()
    }

    /// Contents of an `args.gn` file, one `key = value` per line
    pub fn to_gn(&self) -> String {
        let mut out = String::new();
        for arg in &self.args {
            out.push_str(&arg.to_string());
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a GeneratorArgs {
    type Item = &'a GeneratorArg;
    type IntoIter = std::slice::Iter<'a, GeneratorArg>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}

/// CMake boolean literal
pub fn cmake_bool(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

/// GN boolean literal
pub fn gn_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// GN string literal
pub fn gn_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_duplicates() {
        let mut args = GeneratorArgs::new();
        args.push("USE_THREAD", cmake_bool(true))
            .push("BUILD_CCT", cmake_bool(false))
            .push("USE_THREAD", cmake_bool(false));

        assert_eq!(
            args.to_cmake_defines(),
            vec!["-DUSE_THREAD=ON", "-DBUILD_CCT=OFF", "-DUSE_THREAD=OFF"]
        );
        assert_eq!(args.get_last("USE_THREAD"), Some("OFF"));
        assert_eq!(args.get_last("MISSING"), None);
    }

    #[test]
    fn test_gn_rendering() {
        let mut args = GeneratorArgs::new();
        args.push("is_debug", gn_bool(false))
            .push("target_cpu", gn_string("x64"));
        assert_eq!(args.to_gn(), "is_debug = false\ntarget_cpu = \"x64\"\n");
    }

    #[test]
    fn test_gn_string_escapes() {
        assert_eq!(gn_string(r#"C:\a"b"#), r#""C:\\a\"b""#);
    }
}
