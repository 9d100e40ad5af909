// src/options/mod.rs

//! Build options and their resolution
//!
//! A recipe declares its options (name, legal values, default). The
//! resolver combines those declarations with user overrides and the recipe's
//! platform rules to produce a frozen [`BuildConfiguration`].

pub mod condition;
mod resolver;

pub use condition::Condition;
pub use resolver::{resolve, Action, Rule};

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The value of a single option
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
    /// "Leave it to the upstream build system": nothing is passed through
    Default,
}

impl OptionValue {
    /// Truthiness used by rules and recipes
    ///
    /// Choices are truthy unless they spell a false value ("false", "0").
    pub fn is_true(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Choice(c) => !matches!(c.to_ascii_lowercase().as_str(), "false" | "0" | ""),
            OptionValue::Default => false,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, OptionValue::Default)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "True"),
            OptionValue::Bool(false) => write!(f, "False"),
            OptionValue::Choice(c) => write!(f, "{}", c),
            OptionValue::Default => write!(f, "default"),
        }
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            OptionValue::Bool(b) => serializer.serialize_bool(*b),
            OptionValue::Choice(c) => serializer.serialize_str(c),
            OptionValue::Default => serializer.serialize_str("default"),
        }
    }
}

/// The legal value set of an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Choice(Vec<String>),
}

/// A declared option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDecl {
    pub name: String,
    pub kind: OptionKind,
    /// Whether the `default` sentinel is a legal value
    pub allow_default: bool,
    pub default: OptionValue,
}

impl OptionDecl {
    /// A plain true/false option
    pub fn boolean(name: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Bool,
            allow_default: false,
            default: OptionValue::Bool(default),
        }
    }

    /// A boolean that may also be left to the upstream default
    pub fn tristate(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Bool,
            allow_default: true,
            default: OptionValue::Default,
        }
    }

    /// An enumeration, optionally including the `default` sentinel
    pub fn choice(name: &str, values: &[&str], allow_default: bool, default: OptionValue) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::Choice(values.iter().map(|v| v.to_string()).collect()),
            allow_default,
            default,
        }
    }

    /// Parse a user-supplied string into a legal value for this option
    pub fn parse_value(&self, raw: &str) -> Result<OptionValue> {
        let trimmed = raw.trim();
        if self.allow_default && trimmed == "default" {
            return Ok(OptionValue::Default);
        }

        match &self.kind {
            OptionKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(OptionValue::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(OptionValue::Bool(false)),
                _ => Err(self.illegal(raw)),
            },
            OptionKind::Choice(values) => values
                .iter()
                .find(|v| v.as_str() == trimmed)
                .map(|v| OptionValue::Choice(v.clone()))
                .ok_or_else(|| self.illegal(raw)),
        }
    }

    /// Human-readable list of legal values
    pub fn legal_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        if self.allow_default {
            values.push("default".to_string());
        }
        match &self.kind {
            OptionKind::Bool => {
                values.push("True".to_string());
                values.push("False".to_string());
            }
            OptionKind::Choice(choices) => values.extend(choices.iter().cloned()),
        }
        values
    }

    fn illegal(&self, raw: &str) -> Error {
        Error::ConfigurationError(format!(
            "Invalid value '{}' for option '{}' (possible values: {})",
            raw,
            self.name,
            self.legal_values().join(", ")
        ))
    }
}

/// Resolved option values
///
/// Built once by [`resolve`] and read-only afterwards. An option removed by a
/// platform rule is absent here, not defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct BuildConfiguration {
    values: BTreeMap<String, OptionValue>,
}

impl BuildConfiguration {
    pub(crate) fn from_values(values: BTreeMap<String, OptionValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Truthiness of an option; absent options are false
    pub fn get_bool(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(OptionValue::is_true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}
