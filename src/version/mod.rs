// src/version/mod.rs

//! Version handling and range checks for recipe versions
//!
//! Upstream versions are dotted numeric strings of any length
//! ("9.1.0", "11.6.189.19", "193"). Comparison is component-wise with
//! missing trailing components treated as zero, so "7.0" == "7.0.0".

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed dotted numeric version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parts: Vec<u64>,
}

impl Version {
    /// Parse a version string
    ///
    /// Examples:
    /// - "9.1.0" -> [9, 1, 0]
    /// - "11.6.189.19" -> [11, 6, 189, 19]
    /// - "193" -> [193]
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }

        let parts = raw
            .split('.')
            .map(|p| {
                p.parse::<u64>().map_err(|e| {
                    Error::ParseError(format!("Invalid version component '{}' in '{}': {}", p, raw, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Numeric components as parsed
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// First component
    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    /// The version exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Components with trailing zeros dropped, used for equality hashing
    fn significant(&self) -> &[u64] {
        let end = self
            .parts
            .iter()
            .rposition(|p| *p != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.parts[..end]
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

// Comparisons against literal strings, e.g. `version >= "8.1.0"`.
// An unparsable literal compares as unordered (every comparison is false).
impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        Version::parse(other).is_ok_and(|o| *self == o)
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialOrd<str> for Version {
    fn partial_cmp(&self, other: &str) -> Option<Ordering> {
        Version::parse(other).ok().map(|o| self.cmp(&o))
    }
}

impl PartialOrd<&str> for Version {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        self.partial_cmp(*other)
    }
}

/// Version constraint operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version is acceptable
    Any,
    /// Exact version match
    Exact(Version),
    /// Greater than
    GreaterThan(Version),
    /// Greater than or equal
    GreaterOrEqual(Version),
    /// Less than
    LessThan(Version),
    /// Less than or equal
    LessOrEqual(Version),
    /// Not equal
    NotEqual(Version),
    /// Both constraints must be satisfied (for ranges like ">=7.1.0, <9.0.0")
    And(Box<VersionConstraint>, Box<VersionConstraint>),
}

impl VersionConstraint {
    /// Parse a version constraint string
    ///
    /// Examples:
    /// - "<7.0.0" -> LessThan(7.0.0)
    /// - ">=7.1.0, <9.0.0" -> And(GreaterOrEqual(7.1.0), LessThan(9.0.0))
    /// - "9" -> Exact(9)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionConstraint::Any);
        }

        if s.contains(',') {
            let mut parts = s.split(',').map(str::trim).filter(|p| !p.is_empty());
            let first = parts
                .next()
                .ok_or_else(|| Error::ParseError(format!("Empty version range: '{}'", s)))?;
            let mut constraint = Self::parse(first)?;
            for part in parts {
                constraint = VersionConstraint::And(Box::new(constraint), Box::new(Self::parse(part)?));
            }
            return Ok(constraint);
        }

        if let Some(rest) = s.strip_prefix(">=") {
            Ok(VersionConstraint::GreaterOrEqual(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(VersionConstraint::LessOrEqual(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix("!=") {
            Ok(VersionConstraint::NotEqual(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix("==") {
            Ok(VersionConstraint::Exact(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(VersionConstraint::GreaterThan(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(VersionConstraint::LessThan(Version::parse(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(VersionConstraint::Exact(Version::parse(rest)?))
        } else {
            Ok(VersionConstraint::Exact(Version::parse(s)?))
        }
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => version == v,
            VersionConstraint::GreaterThan(v) => version > v,
            VersionConstraint::GreaterOrEqual(v) => version >= v,
            VersionConstraint::LessThan(v) => version < v,
            VersionConstraint::LessOrEqual(v) => version <= v,
            VersionConstraint::NotEqual(v) => version != v,
            VersionConstraint::And(left, right) => {
                left.satisfies(version) && right.satisfies(version)
            }
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(v) => write!(f, "=={}", v),
            VersionConstraint::GreaterThan(v) => write!(f, ">{}", v),
            VersionConstraint::GreaterOrEqual(v) => write!(f, ">={}", v),
            VersionConstraint::LessThan(v) => write!(f, "<{}", v),
            VersionConstraint::LessOrEqual(v) => write!(f, "<={}", v),
            VersionConstraint::NotEqual(v) => write!(f, "!={}", v),
            VersionConstraint::And(left, right) => write!(f, "{}, {}", left, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let v = Version::parse("11.6.189.19").unwrap();
        assert_eq!(v.parts(), &[11, 6, 189, 19]);
        assert_eq!(v.major(), 11);
        assert_eq!(v.to_string(), "11.6.189.19");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x.0").is_err());
        assert!(Version::parse("9.1.0-rc1").is_err());
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        let a = Version::parse("7.0").unwrap();
        let b = Version::parse("7.0.0").unwrap();
        assert_eq!(a, b);

        use std::collections::HashSet;
        let set: HashSet<Version> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let a = Version::parse("9.0.0").unwrap();
        let b = Version::parse("10.0.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_compare_with_literals() {
        let v = Version::parse("8.1.0").unwrap();
        assert!(v >= "8.1.0");
        assert!(v < "8.2.0");
        assert!(v > "7.2.1");
        assert!(v == "8.1");
        // Unparsable literals never compare
        assert!(!(v < "garbage"));
        assert!(!(v >= "garbage"));
    }

    #[test]
    fn test_constraint_range() {
        let c = VersionConstraint::parse(">=7.1.0, <9.0.0").unwrap();
        assert!(c.satisfies(&Version::parse("7.1.0").unwrap()));
        assert!(c.satisfies(&Version::parse("8.2.1").unwrap()));
        assert!(!c.satisfies(&Version::parse("9.0.0").unwrap()));
        assert!(!c.satisfies(&Version::parse("7.0.1").unwrap()));
    }

    #[test]
    fn test_constraint_operators() {
        let v = Version::parse("9").unwrap();
        assert!(VersionConstraint::parse("9").unwrap().satisfies(&v));
        assert!(VersionConstraint::parse("==9.0").unwrap().satisfies(&v));
        assert!(VersionConstraint::parse("!=10").unwrap().satisfies(&v));
        assert!(VersionConstraint::parse("<=9").unwrap().satisfies(&v));
        assert!(!VersionConstraint::parse(">9").unwrap().satisfies(&v));
        assert!(VersionConstraint::parse("*").unwrap().satisfies(&v));
    }

    #[test]
    fn test_constraint_display_roundtrip() {
        let c = VersionConstraint::parse(">=7.1.0,<9.0.0").unwrap();
        assert_eq!(c.to_string(), ">=7.1.0, <9.0.0");
        assert_eq!(VersionConstraint::parse(&c.to_string()).unwrap(), c);
    }
}
