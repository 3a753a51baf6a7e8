use srcplan_types::component::{ComponentDeps, ComponentName};
use srcplan_types::configured::ConfiguredPackage;
use srcplan_types::description::{
    CondTree, Dependency, FlagAssignment, FlagName, OptionalStanza, PackageDescription,
    UnassignedFlag, VersionRange,
};
use srcplan_types::identity::{HasPackageId, PackageId, PackageName};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("{package}: flag '{flag}' has no assigned value")]
    UnassignedFlag { package: PackageId, flag: FlagName },

    #[error("{package}: flag '{flag}' is not declared by the package")]
    UnknownFlag { package: PackageId, flag: FlagName },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error(
        "{package} ({component}): configured dependencies differ from the description \
         (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    DependencyMismatch {
        package: PackageId,
        component: ComponentName,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("{package} ({component}): {name} is configured more than once ({first}, {second})")]
    DuplicateDependency {
        package: PackageId,
        component: ComponentName,
        name: PackageName,
        first: PackageId,
        second: PackageId,
    },

    #[error("{package} ({component}): {dependency} is outside the declared range {range}")]
    VersionOutOfRange {
        package: PackageId,
        component: ComponentName,
        dependency: PackageId,
        range: VersionRange,
    },
}

/// The dependencies a description implies once every choice is made.
///
/// `flags` must assign every declared flag and nothing else. Test suites and
/// benchmarks only contribute when their stanza is listed.
pub fn finalize_dependencies(
    desc: &PackageDescription,
    flags: &FlagAssignment,
    stanzas: &[OptionalStanza],
) -> Result<ComponentDeps<Dependency>, FinalizeError> {
    let package = &desc.package;
    for flag in &desc.flags {
        if flags.get(&flag.name).is_none() {
            return Err(FinalizeError::UnassignedFlag {
                package: package.clone(),
                flag: flag.name.clone(),
            });
        }
    }
    if let Some((flag, _)) = flags.iter().find(|(name, _)| desc.flag(name).is_none()) {
        return Err(FinalizeError::UnknownFlag {
            package: package.clone(),
            flag: flag.clone(),
        });
    }

    let unassigned = |e: UnassignedFlag| FinalizeError::UnassignedFlag {
        package: package.clone(),
        flag: e.flag,
    };

    let mut out = ComponentDeps::new();
    if let Some(lib) = &desc.library {
        out.insert(ComponentName::Lib, resolve_tree(lib, flags).map_err(unassigned)?);
    }
    for (name, tree) in &desc.executables {
        out.insert(
            ComponentName::Exe(name.clone()),
            resolve_tree(tree, flags).map_err(unassigned)?,
        );
    }
    if stanzas.contains(&OptionalStanza::TestStanzas) {
        for (name, tree) in &desc.test_suites {
            out.insert(
                ComponentName::Test(name.clone()),
                resolve_tree(tree, flags).map_err(unassigned)?,
            );
        }
    }
    if stanzas.contains(&OptionalStanza::BenchStanzas) {
        for (name, tree) in &desc.benchmarks {
            out.insert(
                ComponentName::Bench(name.clone()),
                resolve_tree(tree, flags).map_err(unassigned)?,
            );
        }
    }
    if !desc.setup_depends.is_empty() {
        out.insert(ComponentName::Setup, dedup(desc.setup_depends.clone()));
    }

    debug!(package = %package, components = out.len(), "finalized dependencies");
    Ok(out)
}

fn resolve_tree<T>(
    tree: &CondTree<T>,
    flags: &FlagAssignment,
) -> Result<Vec<Dependency>, UnassignedFlag> {
    let mut out = Vec::new();
    collect_constraints(tree, flags, &mut out)?;
    Ok(dedup(out))
}

fn collect_constraints<T>(
    tree: &CondTree<T>,
    flags: &FlagAssignment,
    out: &mut Vec<Dependency>,
) -> Result<(), UnassignedFlag> {
    out.extend(tree.constraints.iter().cloned());
    for branch in &tree.branches {
        if branch.condition.eval(flags)? {
            collect_constraints(&branch.then_tree, flags, out)?;
        } else if let Some(else_tree) = &branch.else_tree {
            collect_constraints(else_tree, flags, out)?;
        }
    }
    Ok(())
}

fn dedup(deps: Vec<Dependency>) -> Vec<Dependency> {
    let mut out: Vec<Dependency> = Vec::with_capacity(deps.len());
    for dep in deps {
        if !out.contains(&dep) {
            out.push(dep);
        }
    }
    out
}

/// Checks a configured package against its own description.
///
/// Per component, the configured dependencies must name exactly the packages
/// the description implies under the package's flags and stanzas, each of
/// them once, and each chosen version must satisfy every range declared for
/// that name.
pub fn check_configuration(pkg: &ConfiguredPackage) -> Result<(), ConfigurationError> {
    let package = &pkg.source.package_id;
    let implied = finalize_dependencies(&pkg.source.description, &pkg.flags, &pkg.stanzas)?;

    let components: BTreeSet<&ComponentName> = implied
        .components()
        .chain(pkg.dependencies.components())
        .collect();

    for component in components {
        let wanted = implied.get(component).unwrap_or_default();
        let chosen = pkg.dependencies.get(component).unwrap_or_default();

        let wanted_names: BTreeSet<&PackageName> = wanted.iter().map(|d| &d.name).collect();
        let mut chosen_by_name: BTreeMap<&PackageName, &PackageId> = BTreeMap::new();
        for c in chosen {
            let id = c.package_id();
            if let Some(first) = chosen_by_name.insert(&id.name, id) {
                return Err(ConfigurationError::DuplicateDependency {
                    package: package.clone(),
                    component: component.clone(),
                    name: id.name.clone(),
                    first: first.clone(),
                    second: id.clone(),
                });
            }
        }
        let chosen_names: BTreeSet<&PackageName> = chosen_by_name.keys().copied().collect();

        if wanted_names != chosen_names {
            return Err(ConfigurationError::DependencyMismatch {
                package: package.clone(),
                component: component.clone(),
                missing: wanted_names
                    .difference(&chosen_names)
                    .map(|n| n.to_string())
                    .collect(),
                unexpected: chosen_names
                    .difference(&wanted_names)
                    .map(|n| n.to_string())
                    .collect(),
            });
        }

        for chosen in chosen {
            let declared = wanted.iter().filter(|d| d.name == chosen.package_id().name);
            for dep in declared {
                if !dep.accepts(chosen.package_id()) {
                    return Err(ConfigurationError::VersionOutOfRange {
                        package: package.clone(),
                        component: component.clone(),
                        dependency: chosen.package_id().clone(),
                        range: dep.range.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcplan_types::description::{CondBranch, Condition, Flag, Library, TestSuite};

    fn dep(name: &str, range: &str) -> Dependency {
        Dependency::new(name.parse().unwrap(), range.parse().unwrap())
    }

    fn flag(name: &str) -> Flag {
        Flag {
            name: FlagName::new(name),
            default: false,
            manual: false,
            description: None,
        }
    }

    fn desc() -> PackageDescription {
        let mut d = PackageDescription::new("app-1.0".parse().unwrap());
        d.flags = vec![flag("ssl")];
        d.library = Some(CondTree {
            data: Library::default(),
            constraints: vec![dep("base", ">=4")],
            branches: vec![CondBranch {
                condition: Condition::Flag(FlagName::new("ssl")),
                then_tree: CondTree::leaf(Library::default(), vec![dep("tls", "any")]),
                else_tree: Some(CondTree::leaf(Library::default(), vec![dep("base", "<5")])),
            }],
        });
        d.test_suites.insert(
            "unit".to_string(),
            CondTree::leaf(TestSuite::default(), vec![dep("hspec", "any")]),
        );
        d
    }

    fn assign(ssl: bool) -> FlagAssignment {
        [(FlagName::new("ssl"), ssl)].into_iter().collect()
    }

    #[test]
    fn branches_follow_flag_values() {
        let on = finalize_dependencies(&desc(), &assign(true), &[]).unwrap();
        assert_eq!(
            on.get(&ComponentName::Lib).unwrap(),
            &[dep("base", ">=4"), dep("tls", "any")]
        );

        let off = finalize_dependencies(&desc(), &assign(false), &[]).unwrap();
        assert_eq!(
            off.get(&ComponentName::Lib).unwrap(),
            &[dep("base", ">=4"), dep("base", "<5")]
        );
    }

    #[test]
    fn test_suites_need_their_stanza() {
        let without = finalize_dependencies(&desc(), &assign(true), &[]).unwrap();
        assert!(without.get(&ComponentName::Test("unit".to_string())).is_none());

        let with =
            finalize_dependencies(&desc(), &assign(true), &[OptionalStanza::TestStanzas]).unwrap();
        assert_eq!(
            with.get(&ComponentName::Test("unit".to_string())).unwrap(),
            &[dep("hspec", "any")]
        );
    }

    #[test]
    fn assignment_must_be_total_and_known() {
        let err = finalize_dependencies(&desc(), &FlagAssignment::new(), &[]).unwrap_err();
        assert!(matches!(err, FinalizeError::UnassignedFlag { .. }));

        let mut extra = assign(true);
        extra.insert(FlagName::new("debug"), true);
        let err = finalize_dependencies(&desc(), &extra, &[]).unwrap_err();
        assert!(matches!(err, FinalizeError::UnknownFlag { .. }));
    }
}
