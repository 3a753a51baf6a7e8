//! Dependency edges between the packages of one install plan.

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use srcplan_types::configured::PackageFixedDeps;
use srcplan_types::identity::{ComponentId, HasComponentId, HasPackageId, PackageId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("package {0} appears more than once in the plan")]
    DuplicatePackage(PackageId),

    #[error("component id {0} is claimed by more than one package")]
    DuplicateComponent(ComponentId),

    #[error("dependency cycle through {0}")]
    Cycle(PackageId),

    #[error("package {0} is not part of the plan")]
    UnknownPackage(PackageId),
}

/// Directed graph with an edge from every dependency to its dependent.
///
/// Dependencies whose component id belongs to no package in the plan are
/// treated as already installed and kept aside in `external`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<PackageId, ()>,
    nodes: BTreeMap<PackageId, NodeIndex>,
    external: BTreeSet<ComponentId>,
}

impl DependencyGraph {
    pub fn from_packages<P>(packages: &[P]) -> Result<Self, GraphError>
    where
        P: HasPackageId + HasComponentId + PackageFixedDeps,
    {
        let mut sorted: Vec<&P> = packages.iter().collect();
        sorted.sort_by(|a, b| a.package_id().cmp(b.package_id()));

        let mut graph = DiGraph::new();
        let mut nodes = BTreeMap::new();
        let mut by_component: BTreeMap<ComponentId, NodeIndex> = BTreeMap::new();

        for pkg in &sorted {
            let id = pkg.package_id().clone();
            if nodes.contains_key(&id) {
                return Err(GraphError::DuplicatePackage(id));
            }
            let idx = graph.add_node(id.clone());
            nodes.insert(id, idx);

            let component = pkg.component_id();
            if by_component.insert(component.clone(), idx).is_some() {
                return Err(GraphError::DuplicateComponent(component));
            }
        }

        let mut external = BTreeSet::new();
        for pkg in &sorted {
            let to = nodes[pkg.package_id()];
            let deps: BTreeSet<ComponentId> =
                pkg.fixed_dependencies().flat_deps().cloned().collect();
            for dep in deps {
                match by_component.get(&dep) {
                    Some(&from) => {
                        graph.update_edge(from, to, ());
                    }
                    None => {
                        external.insert(dep);
                    }
                }
            }
        }

        debug!(
            packages = graph.node_count(),
            edges = graph.edge_count(),
            external = external.len(),
            "built dependency graph"
        );

        Ok(Self {
            graph,
            nodes,
            external,
        })
    }

    /// Every package, each after all of its dependencies.
    pub fn build_order(&self) -> Result<Vec<PackageId>, GraphError> {
        let order = toposort(&self.graph, None)
            .map_err(|cycle| GraphError::Cycle(self.graph[cycle.node_id()].clone()))?;
        Ok(order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Direct dependencies of `pkg` inside the plan, sorted.
    pub fn dependencies_of(&self, pkg: &PackageId) -> Result<Vec<PackageId>, GraphError> {
        self.neighbors(pkg, Direction::Incoming)
    }

    /// Direct dependents of `pkg`, sorted.
    pub fn dependents_of(&self, pkg: &PackageId) -> Result<Vec<PackageId>, GraphError> {
        self.neighbors(pkg, Direction::Outgoing)
    }

    /// Everything that depends on `pkg`, directly or not, sorted.
    pub fn transitive_dependents(&self, pkg: &PackageId) -> Result<Vec<PackageId>, GraphError> {
        let start = self.index(pkg)?;
        let mut out = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                out.insert(self.graph[idx].clone());
            }
        }
        Ok(out.into_iter().collect())
    }

    /// Component ids depended on but not built by this plan.
    pub fn external(&self) -> &BTreeSet<ComponentId> {
        &self.external
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn index(&self, pkg: &PackageId) -> Result<NodeIndex, GraphError> {
        self.nodes
            .get(pkg)
            .copied()
            .ok_or_else(|| GraphError::UnknownPackage(pkg.clone()))
    }

    fn neighbors(&self, pkg: &PackageId, dir: Direction) -> Result<Vec<PackageId>, GraphError> {
        let idx = self.index(pkg)?;
        let set: BTreeSet<PackageId> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].clone())
            .collect();
        Ok(set.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcplan_types::component::ComponentDeps;
    use srcplan_types::identity::synthesize_component_id;

    struct Node {
        id: PackageId,
        deps: Vec<ComponentId>,
    }

    impl HasPackageId for Node {
        fn package_id(&self) -> &PackageId {
            &self.id
        }
    }

    impl HasComponentId for Node {
        fn component_id(&self) -> ComponentId {
            synthesize_component_id(&self.id)
        }
    }

    impl PackageFixedDeps for Node {
        fn fixed_dependencies(&self) -> ComponentDeps<ComponentId> {
            ComponentDeps::from_lib(self.deps.clone())
        }
    }

    fn pid(s: &str) -> PackageId {
        s.parse().unwrap()
    }

    fn node(id: &str, deps: &[&str]) -> Node {
        Node {
            id: pid(id),
            deps: deps.iter().map(|d| synthesize_component_id(&pid(d))).collect(),
        }
    }

    #[test]
    fn build_order_puts_dependencies_first() {
        let graph = DependencyGraph::from_packages(&[
            node("app-1.0", &["lib-2.0", "base-4.0"]),
            node("lib-2.0", &["base-4.0"]),
            node("base-4.0", &[]),
        ])
        .unwrap();

        let order = graph.build_order().unwrap();
        let pos = |s: &str| order.iter().position(|p| *p == pid(s)).unwrap();
        assert!(pos("base-4.0") < pos("lib-2.0"));
        assert!(pos("lib-2.0") < pos("app-1.0"));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn neighbours_are_sorted_and_directional() {
        let graph = DependencyGraph::from_packages(&[
            node("app-1.0", &["lib-2.0", "base-4.0"]),
            node("lib-2.0", &["base-4.0"]),
            node("base-4.0", &[]),
        ])
        .unwrap();

        assert_eq!(
            graph.dependencies_of(&pid("app-1.0")).unwrap(),
            vec![pid("base-4.0"), pid("lib-2.0")]
        );
        assert_eq!(
            graph.dependents_of(&pid("base-4.0")).unwrap(),
            vec![pid("app-1.0"), pid("lib-2.0")]
        );
        assert_eq!(
            graph.transitive_dependents(&pid("base-4.0")).unwrap(),
            vec![pid("app-1.0"), pid("lib-2.0")]
        );
        assert!(graph.transitive_dependents(&pid("app-1.0")).unwrap().is_empty());
    }

    #[test]
    fn unknown_components_are_external() {
        let installed = ComponentId::Installed(
            srcplan_types::identity::InstalledComponentId::new("ghc-prim-0.9-xyz").unwrap(),
        );
        let graph = DependencyGraph::from_packages(&[Node {
            id: pid("app-1.0"),
            deps: vec![installed.clone()],
        }])
        .unwrap();

        assert!(graph.external().contains(&installed));
        assert!(graph.dependencies_of(&pid("app-1.0")).unwrap().is_empty());
    }

    #[test]
    fn cycles_are_reported() {
        let graph = DependencyGraph::from_packages(&[
            node("a-1.0", &["b-1.0"]),
            node("b-1.0", &["a-1.0"]),
        ])
        .unwrap();
        assert!(matches!(graph.build_order(), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn duplicate_packages_are_rejected() {
        let err = DependencyGraph::from_packages(&[node("a-1.0", &[]), node("a-1.0", &[])])
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicatePackage(pid("a-1.0")));
    }

    #[test]
    fn unknown_package_lookup_fails() {
        let graph = DependencyGraph::from_packages(&[node("a-1.0", &[])]).unwrap();
        assert_eq!(
            graph.dependents_of(&pid("zzz-1.0")).unwrap_err(),
            GraphError::UnknownPackage(pid("zzz-1.0"))
        );
    }
}
