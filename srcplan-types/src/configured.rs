use crate::component::ComponentDeps;
use crate::description::{FlagAssignment, OptionalStanza};
use crate::identity::{
    ComponentId, ConfiguredId, HasComponentId, HasPackageId, InstalledComponentId, PackageId,
    synthesize_component_id,
};
use crate::source::SourcePackage;
use serde::{Deserialize, Serialize};

/// Packages whose dependencies are pinned to exact component ids.
///
/// Anything whose dependencies are still version ranges does not qualify.
pub trait PackageFixedDeps {
    fn fixed_dependencies(&self) -> ComponentDeps<ComponentId>;
}

/// A package that is already installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackageInfo {
    pub id: InstalledComponentId,
    pub source_id: PackageId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<InstalledComponentId>,
}

impl InstalledPackageInfo {
    /// How configured packages refer to this already-installed package.
    pub fn configured_id(&self) -> ConfiguredId {
        ConfiguredId::new(self.source_id.clone(), self.component_id())
    }
}

impl HasPackageId for InstalledPackageInfo {
    fn package_id(&self) -> &PackageId {
        &self.source_id
    }
}

impl HasComponentId for InstalledPackageInfo {
    fn component_id(&self) -> ComponentId {
        ComponentId::Installed(self.id.clone())
    }
}

impl PackageFixedDeps for InstalledPackageInfo {
    /// Installed packages only record library dependencies.
    fn fixed_dependencies(&self) -> ComponentDeps<ComponentId> {
        ComponentDeps::from_lib(
            self.depends
                .iter()
                .cloned()
                .map(ComponentId::Installed)
                .collect(),
        )
    }
}

/// A source package with every build-time choice made.
///
/// `flags` is total over the package's flags and `dependencies` is exactly
/// what the description implies under `flags` and `stanzas`. Neither is
/// checked on construction; the solver is trusted to have done so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredPackage {
    pub source: SourcePackage,

    #[serde(default)]
    pub flags: FlagAssignment,

    #[serde(default)]
    pub stanzas: Vec<OptionalStanza>,

    #[serde(default)]
    pub dependencies: ComponentDeps<ConfiguredId>,
}

impl ConfiguredPackage {
    pub fn new(
        source: SourcePackage,
        flags: FlagAssignment,
        stanzas: Vec<OptionalStanza>,
        dependencies: ComponentDeps<ConfiguredId>,
    ) -> Self {
        Self {
            source,
            flags,
            stanzas,
            dependencies,
        }
    }

    /// How other configured packages refer to this one.
    pub fn configured_id(&self) -> ConfiguredId {
        ConfiguredId::planned(self.source.package_id.clone())
    }

    pub fn stanza_enabled(&self, stanza: OptionalStanza) -> bool {
        self.stanzas.contains(&stanza)
    }
}

impl HasPackageId for ConfiguredPackage {
    fn package_id(&self) -> &PackageId {
        &self.source.package_id
    }
}

impl HasComponentId for ConfiguredPackage {
    fn component_id(&self) -> ComponentId {
        synthesize_component_id(&self.source.package_id)
    }
}

impl PackageFixedDeps for ConfiguredPackage {
    fn fixed_dependencies(&self) -> ComponentDeps<ComponentId> {
        self.dependencies.map(|dep| dep.component_id())
    }
}
