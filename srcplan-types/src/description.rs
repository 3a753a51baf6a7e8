//! Package descriptions with conditional component trees.
//!
//! A description is what a package author wrote: components whose contents
//! and dependencies may hang off conditions over configuration flags. Nothing
//! in here is resolved; choosing flag values and stanzas happens elsewhere.

use crate::identity::{PackageId, PackageName, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagName(pub String);

impl FlagName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value for some (ideally all) of a package's flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagAssignment(BTreeMap<FlagName, bool>);

impl FlagAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: FlagName, value: bool) -> Option<bool> {
        self.0.insert(flag, value)
    }

    pub fn get(&self, flag: &FlagName) -> Option<bool> {
        self.0.get(flag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlagName, bool)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FlagName, bool)> for FlagAssignment {
    fn from_iter<I: IntoIterator<Item = (FlagName, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A flag declared by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub name: FlagName,

    #[serde(default)]
    pub default: bool,

    /// Manual flags are never flipped by the solver.
    #[serde(default)]
    pub manual: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Toggle for an optional component group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionalStanza {
    #[serde(rename = "tests")]
    TestStanzas,
    #[serde(rename = "benchmarks")]
    BenchStanzas,
}

impl fmt::Display for OptionalStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionalStanza::TestStanzas => f.write_str("tests"),
            OptionalStanza::BenchStanzas => f.write_str("benchmarks"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid version range '{text}'")]
pub struct VersionRangeError {
    pub text: String,
}

/// A set of acceptable versions.
///
/// Text form: `any`, `==1.2`, `>1.2`, `>=1.2`, `<2`, `<=2`, combined with
/// `&&` (binds tighter) and `||`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionRange {
    Any,
    This(Version),
    Later(Version),
    Earlier(Version),
    OrLater(Version),
    OrEarlier(Version),
    Intersect(Box<VersionRange>, Box<VersionRange>),
    Union(Box<VersionRange>, Box<VersionRange>),
}

impl VersionRange {
    pub fn contains(&self, v: &Version) -> bool {
        match self {
            VersionRange::Any => true,
            VersionRange::This(x) => v == x,
            VersionRange::Later(x) => v > x,
            VersionRange::Earlier(x) => v < x,
            VersionRange::OrLater(x) => v >= x,
            VersionRange::OrEarlier(x) => v <= x,
            VersionRange::Intersect(a, b) => a.contains(v) && b.contains(v),
            VersionRange::Union(a, b) => a.contains(v) || b.contains(v),
        }
    }

    fn parse_atom(text: &str) -> Result<Self, VersionRangeError> {
        let invalid = || VersionRangeError {
            text: text.to_string(),
        };
        let t = text.trim();
        if t == "any" || t == "*" {
            return Ok(VersionRange::Any);
        }
        let (ctor, rest): (fn(Version) -> VersionRange, &str) =
            if let Some(rest) = t.strip_prefix(">=") {
                (VersionRange::OrLater, rest)
            } else if let Some(rest) = t.strip_prefix("<=") {
                (VersionRange::OrEarlier, rest)
            } else if let Some(rest) = t.strip_prefix("==") {
                (VersionRange::This, rest)
            } else if let Some(rest) = t.strip_prefix('>') {
                (VersionRange::Later, rest)
            } else if let Some(rest) = t.strip_prefix('<') {
                (VersionRange::Earlier, rest)
            } else {
                return Err(invalid());
            };
        let version = rest.trim().parse::<Version>().map_err(|_| invalid())?;
        Ok(ctor(version))
    }
}

impl FromStr for VersionRange {
    type Err = VersionRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut union: Option<VersionRange> = None;
        for alternative in s.split("||") {
            let mut intersection: Option<VersionRange> = None;
            for atom in alternative.split("&&") {
                let atom = VersionRange::parse_atom(atom).map_err(|_| VersionRangeError {
                    text: s.to_string(),
                })?;
                intersection = Some(match intersection {
                    None => atom,
                    Some(acc) => VersionRange::Intersect(Box::new(acc), Box::new(atom)),
                });
            }
            let Some(intersection) = intersection else {
                return Err(VersionRangeError {
                    text: s.to_string(),
                });
            };
            union = Some(match union {
                None => intersection,
                Some(acc) => VersionRange::Union(Box::new(acc), Box::new(intersection)),
            });
        }
        union.ok_or_else(|| VersionRangeError {
            text: s.to_string(),
        })
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => f.write_str("any"),
            VersionRange::This(v) => write!(f, "=={v}"),
            VersionRange::Later(v) => write!(f, ">{v}"),
            VersionRange::Earlier(v) => write!(f, "<{v}"),
            VersionRange::OrLater(v) => write!(f, ">={v}"),
            VersionRange::OrEarlier(v) => write!(f, "<={v}"),
            VersionRange::Intersect(a, b) => write!(f, "{a} && {b}"),
            VersionRange::Union(a, b) => write!(f, "{a} || {b}"),
        }
    }
}

/// A dependency on some version of a named package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: PackageName,

    #[serde(default = "any_version")]
    pub range: VersionRange,
}

fn any_version() -> VersionRange {
    VersionRange::Any
}

impl Dependency {
    pub fn new(name: PackageName, range: VersionRange) -> Self {
        Self { name, range }
    }

    pub fn accepts(&self, pkg: &PackageId) -> bool {
        pkg.name == self.name && self.range.contains(&pkg.version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.range)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("flag '{flag}' has no assigned value")]
pub struct UnassignedFlag {
    pub flag: FlagName,
}

/// A boolean expression over configuration flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Lit(bool),
    Flag(FlagName),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Evaluates against a flag assignment. Every flag the condition mentions
    /// must be assigned, even ones a short-circuit would skip.
    pub fn eval(&self, flags: &FlagAssignment) -> Result<bool, UnassignedFlag> {
        match self {
            Condition::Lit(b) => Ok(*b),
            Condition::Flag(name) => flags.get(name).ok_or_else(|| UnassignedFlag {
                flag: name.clone(),
            }),
            Condition::Not(c) => Ok(!c.eval(flags)?),
            Condition::And(a, b) => {
                let (a, b) = (a.eval(flags)?, b.eval(flags)?);
                Ok(a && b)
            }
            Condition::Or(a, b) => {
                let (a, b) = (a.eval(flags)?, b.eval(flags)?);
                Ok(a || b)
            }
        }
    }
}

/// A component body plus dependencies, some of them behind conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondTree<T> {
    pub data: T,

    #[serde(default)]
    pub constraints: Vec<Dependency>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<CondBranch<T>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondBranch<T> {
    pub condition: Condition,
    pub then_tree: CondTree<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_tree: Option<CondTree<T>>,
}

impl<T> CondTree<T> {
    pub fn leaf(data: T, constraints: Vec<Dependency>) -> Self {
        Self {
            data,
            constraints,
            branches: Vec::new(),
        }
    }

    /// Rewrites every node's data, keeping conditions and constraints as they are.
    pub fn map_data<U, F: FnMut(T) -> U>(self, f: &mut F) -> CondTree<U> {
        CondTree {
            data: f(self.data),
            constraints: self.constraints,
            branches: self
                .branches
                .into_iter()
                .map(|b| CondBranch {
                    condition: b.condition,
                    then_tree: b.then_tree.map_data(f),
                    else_tree: b.else_tree.map(|t| t.map_data(f)),
                })
                .collect(),
        }
    }

    /// Data of every node, root first.
    pub fn all_data(&self) -> Vec<&T> {
        let mut out = vec![&self.data];
        for b in &self.branches {
            out.extend(b.then_tree.all_data());
            if let Some(e) = &b.else_tree {
                out.extend(e.all_data());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub exposed_modules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Executable {
    pub main_is: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSuite {
    pub main_is: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Benchmark {
    pub main_is: String,
    pub enabled: bool,
}

/// Everything a package declares, before any configuration choice is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescription {
    pub package: PackageId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    #[serde(default)]
    pub flags: Vec<Flag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<CondTree<Library>>,

    #[serde(default)]
    pub executables: BTreeMap<String, CondTree<Executable>>,

    #[serde(default)]
    pub test_suites: BTreeMap<String, CondTree<TestSuite>>,

    #[serde(default)]
    pub benchmarks: BTreeMap<String, CondTree<Benchmark>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup_depends: Vec<Dependency>,
}

impl PackageDescription {
    pub fn new(package: PackageId) -> Self {
        Self {
            package,
            synopsis: None,
            flags: Vec::new(),
            library: None,
            executables: BTreeMap::new(),
            test_suites: BTreeMap::new(),
            benchmarks: BTreeMap::new(),
            setup_depends: Vec::new(),
        }
    }

    pub fn flag(&self, name: &FlagName) -> Option<&Flag> {
        self.flags.iter().find(|f| &f.name == name)
    }
}
