use crate::description::{PackageDescription, VersionRange};
use crate::identity::{HasPackageId, PackageId, PackageName, Version};
use crate::location::UnresolvedPkgLoc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package description together with where its sources are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePackage {
    pub package_id: PackageId,
    pub description: PackageDescription,
    pub location: UnresolvedPkgLoc,

    /// Raw description text that supersedes the one inside the tarball, e.g.
    /// when the index carries a revised description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_override: Option<String>,
}

impl HasPackageId for SourcePackage {
    fn package_id(&self) -> &PackageId {
        &self.package_id
    }
}

/// Every known source package, keyed by name then version, plus soft version
/// preferences per name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePackageDb {
    #[serde(default)]
    pub index: BTreeMap<PackageName, BTreeMap<Version, SourcePackage>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preferences: BTreeMap<PackageName, VersionRange>,
}

impl SourcePackageDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package, replacing any entry with the same id.
    pub fn insert(&mut self, pkg: SourcePackage) -> Option<SourcePackage> {
        self.index
            .entry(pkg.package_id.name.clone())
            .or_default()
            .insert(pkg.package_id.version.clone(), pkg)
    }

    /// All versions of `name`, oldest first.
    pub fn lookup_name(&self, name: &PackageName) -> Vec<&SourcePackage> {
        self.index
            .get(name)
            .map(|versions| versions.values().collect())
            .unwrap_or_default()
    }

    pub fn lookup_id(&self, id: &PackageId) -> Option<&SourcePackage> {
        self.index.get(&id.name)?.get(&id.version)
    }

    pub fn set_preference(&mut self, name: PackageName, range: VersionRange) {
        self.preferences.insert(name, range);
    }

    pub fn preference(&self, name: &PackageName) -> Option<&VersionRange> {
        self.preferences.get(name)
    }

    /// Versions of `name` inside its preferred range, oldest first.
    ///
    /// A preference only biases the choice: when no version satisfies it,
    /// every version is returned.
    pub fn preferred_candidates(&self, name: &PackageName) -> Vec<&SourcePackage> {
        let all = self.lookup_name(name);
        let Some(range) = self.preference(name) else {
            return all;
        };
        let preferred: Vec<&SourcePackage> = all
            .iter()
            .copied()
            .filter(|p| range.contains(&p.package_id.version))
            .collect();
        if preferred.is_empty() { all } else { preferred }
    }

    pub fn package_names(&self) -> impl Iterator<Item = &PackageName> {
        self.index.keys()
    }

    /// Number of distinct package ids.
    pub fn len(&self) -> usize {
        self.index.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
