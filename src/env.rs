// src/env.rs

//! Environment overlays for spawned tools
//!
//! An [`EnvOverlay`] is an ordered list of define / prepend / append
//! operations. It is applied to each child `Command` individually; the
//! environment of the stockpot process itself is never modified.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::process::Command;

/// Separator for path-list variables on the host
#[cfg(windows)]
pub const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_SEPARATOR: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EnvOp {
    /// Set the variable, replacing any inherited value
    Define { name: String, value: String },
    /// Put a path in front of the existing list
    Prepend { name: String, value: String },
    /// Put a path at the end of the existing list
    Append { name: String, value: String },
}

impl EnvOp {
    pub fn name(&self) -> &str {
        match self {
            EnvOp::Define { name, .. } | EnvOp::Prepend { name, .. } | EnvOp::Append { name, .. } => {
                name
            }
        }
    }
}

/// Ordered environment modifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvOverlay {
    ops: Vec<EnvOp>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.ops.push(EnvOp::Define {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn prepend_path(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.ops.push(EnvOp::Prepend {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn append_path(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.ops.push(EnvOp::Append {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append another overlay's operations after ours
    pub fn extend(&mut self, other: &EnvOverlay) {
        self.ops.extend(other.ops.iter().cloned());
    }

    pub fn ops(&self) -> &[EnvOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Final values of every touched variable, starting from `base`
    ///
    /// Operations are folded in order. A prepend or append onto an unset
    /// variable yields just the new entry.
    pub fn resolve_with<F>(&self, base: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut resolved: BTreeMap<String, Option<String>> = BTreeMap::new();

        for op in &self.ops {
            let current = resolved
                .entry(op.name().to_string())
                .or_insert_with(|| base(op.name()).filter(|v| !v.is_empty()));

            let next = match op {
                EnvOp::Define { value, .. } => value.clone(),
                EnvOp::Prepend { value, .. } => match current.as_deref() {
                    Some(existing) => format!("{}{}{}", value, PATH_SEPARATOR, existing),
                    None => value.clone(),
                },
                EnvOp::Append { value, .. } => match current.as_deref() {
                    Some(existing) => format!("{}{}{}", existing, PATH_SEPARATOR, value),
                    None => value.clone(),
                },
            };
            *current = Some(next);
        }

        resolved
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }

    /// Final values against the current process environment
    pub fn resolve(&self) -> BTreeMap<String, String> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Set the overlay on a child command
    pub fn apply_to(&self, command: &mut Command) {
        for (name, value) in self.resolve() {
            command.env(name, value);
        }
    }

    /// Render as a script that can be sourced to reproduce the build
    /// environment by hand
    pub fn render_script(&self, flavor: ScriptFlavor) -> String {
        let mut out = String::new();
        match flavor {
            ScriptFlavor::Sh => {
                out.push_str("# Generated by stockpot\n");
                for op in &self.ops {
                    let _ = match op {
                        EnvOp::Define { name, value } => {
                            writeln!(out, "export {}=\"{}\"", name, sh_escape(value))
                        }
                        EnvOp::Prepend { name, value } => writeln!(
                            out,
                            "export {n}=\"{v}${{{n}:+:${n}}}\"",
                            n = name,
                            v = sh_escape(value)
                        ),
                        EnvOp::Append { name, value } => writeln!(
                            out,
                            "export {n}=\"${{{n}:+${n}:}}{v}\"",
                            n = name,
                            v = sh_escape(value)
                        ),
                    };
                }
            }
            ScriptFlavor::Bat => {
                out.push_str("@echo off\r\nrem Generated by stockpot\r\n");
                for op in &self.ops {
                    let _ = match op {
                        EnvOp::Define { name, value } => write!(out, "set \"{}={}\"\r\n", name, value),
                        EnvOp::Prepend { name, value } => {
                            write!(out, "set \"{n}={v};%{n}%\"\r\n", n = name, v = value)
                        }
                        EnvOp::Append { name, value } => {
                            write!(out, "set \"{n}=%{n}%;{v}\"\r\n", n = name, v = value)
                        }
                    };
                }
            }
        }
        out
    }
}

/// Script dialect for [`EnvOverlay::render_script`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    Sh,
    Bat,
}

impl ScriptFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            ScriptFlavor::Bat
        } else {
            ScriptFlavor::Sh
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ScriptFlavor::Sh => "stockpot-buildenv.sh",
            ScriptFlavor::Bat => "stockpot-buildenv.bat",
        }
    }
}

fn sh_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`")
}
