// src/options/resolver.rs

//! Option resolution: defaults, user overrides and the recipe rule table

use super::{BuildConfiguration, Condition, OptionDecl, OptionValue};
use crate::error::{Error, Result};
use crate::settings::Target;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What a rule does when its condition holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Delete the option from the configuration, whatever the user asked for
    Remove(String),
    /// Refuse the configuration
    Reject(String),
}

/// One row of a recipe's rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub condition: Condition,
    pub action: Action,
}

impl Rule {
    pub fn remove(condition: Condition, option: &str) -> Self {
        Self {
            condition,
            action: Action::Remove(option.to_string()),
        }
    }

    pub fn reject(condition: Condition, reason: &str) -> Self {
        Self {
            condition,
            action: Action::Reject(reason.to_string()),
        }
    }
}

/// Resolve a recipe's options for a target
///
/// 1. Start from the declared defaults.
/// 2. Validate every override (unknown name or illegal value is an error).
/// 3. Apply the overrides.
/// 4. Walk the rules in order. Conditions see the configuration as it stands
///    at that row, so a removal earlier in the table is visible later.
/// 5. Freeze.
///
/// Nothing here touches the file system.
pub fn resolve(
    decls: &[OptionDecl],
    rules: &[Rule],
    target: &Target,
    overrides: &BTreeMap<String, String>,
) -> Result<BuildConfiguration> {
    let mut values: BTreeMap<String, OptionValue> = decls
        .iter()
        .map(|d| (d.name.clone(), d.default.clone()))
        .collect();

    let mut parsed = Vec::with_capacity(overrides.len());
    for (name, raw) in overrides {
        let decl = decls.iter().find(|d| &d.name == name).ok_or_else(|| {
            Error::ConfigurationError(format!(
                "Unknown option '{}' (declared options: {})",
                name,
                decls
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        parsed.push((name.clone(), decl.parse_value(raw)?));
    }

    for (name, value) in parsed {
        debug!("Option override: {}={}", name, value);
        values.insert(name, value);
    }

    for rule in rules {
        let current = BuildConfiguration::from_values(values.clone());
        if !rule.condition.holds(target, &current) {
            continue;
        }

        match &rule.action {
            Action::Remove(name) => {
                if values.remove(name).is_some() {
                    debug!("Removed option '{}' ({})", name, rule.condition);
                    if overrides.contains_key(name) {
                        warn!(
                            "Ignoring override for option '{}': not applicable when {}",
                            name, rule.condition
                        );
                    }
                }
            }
            Action::Reject(reason) => {
                return Err(Error::ConfigurationError(reason.clone()));
            }
        }
    }

    Ok(BuildConfiguration::from_values(values))
}
