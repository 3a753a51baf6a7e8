//! Configured packages whose dependencies have all been installed.

use crate::component::{ComponentDeps, ComponentName};
use crate::configured::{ConfiguredPackage, InstalledPackageInfo, PackageFixedDeps};
use crate::identity::{ComponentId, ConfiguredId, HasComponentId, HasPackageId, PackageId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromotionError {
    #[error("{package}: no installed package supplied for dependency {dependency} ({component})")]
    Missing {
        package: PackageId,
        component: ComponentName,
        dependency: PackageId,
    },

    #[error("{package}: installed package {supplied} is not a dependency")]
    Unused { package: PackageId, supplied: PackageId },

    #[error("{package}: installed package {supplied} supplied more than once")]
    Duplicate { package: PackageId, supplied: PackageId },

    #[error("{package}: value supplied for dependency {dependency} is not installed ({found})")]
    NotInstalled {
        package: PackageId,
        dependency: PackageId,
        found: ComponentId,
    },

    #[error("{package}: dependency {dependency} was planned as {expected} but {found} was supplied")]
    ComponentMismatch {
        package: PackageId,
        dependency: PackageId,
        expected: ComponentId,
        found: ComponentId,
    },
}

/// A package ready to build: every dependency is an installed value.
///
/// The only way to get one is [`GenericReadyPackage::promote`], so every
/// dependency's synthesized id has been replaced by what was installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericReadyPackage<S, I> {
    package: S,
    dependencies: ComponentDeps<I>,
}

pub type ReadyPackage = GenericReadyPackage<ConfiguredPackage, InstalledPackageInfo>;

impl<S, I> GenericReadyPackage<S, I> {
    pub fn package(&self) -> &S {
        &self.package
    }

    pub fn dependencies(&self) -> &ComponentDeps<I> {
        &self.dependencies
    }

    pub fn into_parts(self) -> (S, ComponentDeps<I>) {
        (self.package, self.dependencies)
    }
}

impl<I> GenericReadyPackage<ConfiguredPackage, I>
where
    I: HasPackageId + HasComponentId + Clone,
{
    /// Swaps every configured dependency for its installed counterpart.
    ///
    /// `installed` must hold exactly one value per distinct dependency; list
    /// order within each component is kept. A dependency referenced from more
    /// than one component gets the same installed value in each.
    pub fn promote(
        configured: ConfiguredPackage,
        installed: impl IntoIterator<Item = I>,
    ) -> Result<Self, PromotionError> {
        let package = configured.package_id().clone();

        let mut by_id: BTreeMap<PackageId, I> = BTreeMap::new();
        for value in installed {
            let id = value.package_id().clone();
            if by_id.contains_key(&id) {
                return Err(PromotionError::Duplicate {
                    package,
                    supplied: id,
                });
            }
            by_id.insert(id, value);
        }

        let mut used = BTreeSet::new();
        let dependencies = configured.dependencies.try_map(
            |component: &ComponentName, dep: &ConfiguredId| -> Result<I, PromotionError> {
                let value = by_id
                    .get(dep.package_id())
                    .ok_or_else(|| PromotionError::Missing {
                        package: package.clone(),
                        component: component.clone(),
                        dependency: dep.package_id().clone(),
                    })?;
                let found = value.component_id();
                if found.is_synthesized() {
                    return Err(PromotionError::NotInstalled {
                        package: package.clone(),
                        dependency: dep.package_id().clone(),
                        found,
                    });
                }
                let expected = dep.component_id();
                if !expected.is_synthesized() && found != expected {
                    return Err(PromotionError::ComponentMismatch {
                        package: package.clone(),
                        dependency: dep.package_id().clone(),
                        expected,
                        found,
                    });
                }
                used.insert(dep.package_id().clone());
                Ok(value.clone())
            },
        )?;

        if let Some(extra) = by_id.keys().find(|id| !used.contains(*id)) {
            return Err(PromotionError::Unused {
                package,
                supplied: extra.clone(),
            });
        }

        Ok(Self {
            package: configured,
            dependencies,
        })
    }
}

impl<S: HasPackageId, I> HasPackageId for GenericReadyPackage<S, I> {
    fn package_id(&self) -> &PackageId {
        self.package.package_id()
    }
}

impl<S: HasComponentId, I> HasComponentId for GenericReadyPackage<S, I> {
    fn component_id(&self) -> ComponentId {
        self.package.component_id()
    }
}

impl<S, I: HasComponentId> PackageFixedDeps for GenericReadyPackage<S, I> {
    fn fixed_dependencies(&self) -> ComponentDeps<ComponentId> {
        self.dependencies.map(|dep| dep.component_id())
    }
}
