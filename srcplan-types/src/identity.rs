//! Package names, versions and the ids built from them.
//!
//! Two kinds of component id exist side by side while a plan executes:
//! ids handed out by a real install step, and ids synthesized from a
//! [`PackageId`] before anything has been built. They live in disjoint value
//! spaces: synthesized ids render with [`SYNTHESIZED_ID_PREFIX`], and
//! [`InstalledComponentId`] refuses any value carrying that prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Marker reserved for synthesized component ids.
pub const SYNTHESIZED_ID_PREFIX: &str = "fake-installed-";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid version '{text}'")]
    InvalidVersion { text: String },

    #[error("invalid package id '{text}': expected <name>-<version>")]
    InvalidPackageId { text: String },

    #[error("installed component id must not be empty")]
    EmptyComponentId,

    #[error("installed component id '{id}' uses the reserved prefix 'fake-installed-'")]
    ReservedPrefix { id: String },
}

/// A package name such as `text` or `http-client`.
///
/// Names are `-`-separated segments of ASCII alphanumerics, and every segment
/// holds at least one letter. That keeps `name-version` renderings unambiguous:
/// the version is always whatever follows the last `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        let invalid = |reason| IdError::InvalidName {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        for segment in name.split('-') {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid("only ASCII letters, digits and '-' are allowed"));
            }
            if !segment.chars().any(|c| c.is_ascii_alphabetic()) {
                return Err(invalid("every segment needs a letter"));
            }
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

impl FromStr for PackageName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dotted numeric version (`1.2.3`, `0.10.0.1`).
///
/// Ordering is component-wise, so `1.2 < 1.2.0 < 1.10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(components: Vec<u64>) -> Result<Self, IdError> {
        if components.is_empty() {
            return Err(IdError::InvalidVersion {
                text: String::new(),
            });
        }
        Ok(Self(components))
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdError::InvalidVersion {
            text: s.to_string(),
        };
        let mut components = Vec::new();
        for part in s.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            components.push(part.parse::<u64>().map_err(|_| invalid())?);
        }
        Self::new(components).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Version {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Human-facing package identity: a name plus an exact version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    pub name: PackageName,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: PackageName, version: Version) -> Self {
        Self { name, version }
    }
}

impl FromStr for PackageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdError::InvalidPackageId {
            text: s.to_string(),
        };
        let (name, version) = s.rsplit_once('-').ok_or_else(invalid)?;
        Ok(Self {
            name: name.parse().map_err(|_| invalid())?,
            version: version.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for PackageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageId> for String {
    fn from(value: PackageId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Id assigned to a component by a real install step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstalledComponentId(String);

impl InstalledComponentId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::EmptyComponentId);
        }
        if id.starts_with(SYNTHESIZED_ID_PREFIX) {
            return Err(IdError::ReservedPrefix { id });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InstalledComponentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstalledComponentId> for String {
    fn from(value: InstalledComponentId) -> Self {
        value.0
    }
}

impl fmt::Display for InstalledComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build identity of a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ComponentId {
    /// Stand-in derived from the package id; the package is not built yet.
    Synthesized(PackageId),
    Installed(InstalledComponentId),
}

impl ComponentId {
    pub fn is_synthesized(&self) -> bool {
        matches!(self, ComponentId::Synthesized(_))
    }

    pub fn installed(&self) -> Option<&InstalledComponentId> {
        match self {
            ComponentId::Installed(id) => Some(id),
            ComponentId::Synthesized(_) => None,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Synthesized(pkg) => write!(f, "{SYNTHESIZED_ID_PREFIX}{pkg}"),
            ComponentId::Installed(id) => id.fmt(f),
        }
    }
}

impl From<InstalledComponentId> for ComponentId {
    fn from(value: InstalledComponentId) -> Self {
        ComponentId::Installed(value)
    }
}

/// Synthesize the component id of a package that has not been built yet.
///
/// Distinct package ids give distinct results, and the result never equals an
/// [`InstalledComponentId`].
pub fn synthesize_component_id(pkg: &PackageId) -> ComponentId {
    ComponentId::Synthesized(pkg.clone())
}

/// A configured package reference: source identity plus build identity.
///
/// Equality, hashing, ordering and display only look at `source_id`.
/// Outside this crate a reference is either [`ConfiguredId::planned`] or
/// taken from an installed package, so the component id always matches the
/// package it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredId {
    source_id: PackageId,
    component_id: ComponentId,
}

impl ConfiguredId {
    pub(crate) fn new(source_id: PackageId, component_id: ComponentId) -> Self {
        Self {
            source_id,
            component_id,
        }
    }

    /// Reference to a package that is still waiting to be built.
    pub fn planned(source_id: PackageId) -> Self {
        let component_id = synthesize_component_id(&source_id);
        Self::new(source_id, component_id)
    }
}

impl PartialEq for ConfiguredId {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id
    }
}

impl Eq for ConfiguredId {}

impl Hash for ConfiguredId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_id.hash(state);
    }
}

impl PartialOrd for ConfiguredId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfiguredId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.source_id.cmp(&other.source_id)
    }
}

impl fmt::Display for ConfiguredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source_id.fmt(f)
    }
}

pub trait HasPackageId {
    fn package_id(&self) -> &PackageId;
}

pub trait HasComponentId {
    fn component_id(&self) -> ComponentId;
}

impl HasPackageId for PackageId {
    fn package_id(&self) -> &PackageId {
        self
    }
}

impl HasPackageId for ConfiguredId {
    fn package_id(&self) -> &PackageId {
        &self.source_id
    }
}

impl HasComponentId for ConfiguredId {
    fn component_id(&self) -> ComponentId {
        self.component_id.clone()
    }
}
