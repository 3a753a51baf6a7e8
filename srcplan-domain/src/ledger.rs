use crate::graph::{DependencyGraph, GraphError};
use serde::{Deserialize, Serialize};
use srcplan_types::identity::PackageId;
use srcplan_types::outcome::{BuildFailure, BuildResult, BuildStage, DocsResult};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("a build result for {0} is already recorded")]
    AlreadyRecorded(PackageId),

    #[error("{package} cannot start: dependency {dependency} has no build result yet")]
    Unrecorded {
        package: PackageId,
        dependency: PackageId,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// One build result per package of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeLedger {
    results: BTreeMap<PackageId, BuildResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: u64,
    pub succeeded: u64,
    pub installed: u64,
    pub docs_failed: u64,

    #[serde(default)]
    pub failed_by_stage: BTreeMap<BuildStage, u64>,
}

impl LedgerSummary {
    pub fn failed(&self) -> u64 {
        self.failed_by_stage.values().sum()
    }
}

/// A dependency that lets its dependents build: it succeeded and produced
/// something installed.
fn satisfies_dependents(result: &BuildResult) -> bool {
    matches!(result, Ok(success) if success.installed.is_some())
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pkg: PackageId, result: BuildResult) -> Result<(), LedgerError> {
        if self.results.contains_key(&pkg) {
            return Err(LedgerError::AlreadyRecorded(pkg));
        }
        match &result {
            Ok(_) => debug!(package = %pkg, "recorded build success"),
            Err(failure) => {
                debug!(package = %pkg, stage = %failure.stage(), "recorded build failure")
            }
        }
        self.results.insert(pkg, result);
        Ok(())
    }

    pub fn get(&self, pkg: &PackageId) -> Option<&BuildResult> {
        self.results.get(pkg)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageId, &BuildResult)> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Decides whether `pkg` may start building.
    ///
    /// Every dependency must already have a result. The first dependency (in
    /// the given order) that did not succeed with an installed package turns
    /// into `DependentFailed`; `None` means the build may go ahead.
    ///
    /// A dependency that succeeded without installing anything (an
    /// executable-only package, say) blocks its dependents too, and is named
    /// in their `DependentFailed` even though its own result is `Ok`.
    pub fn prerequisite_failure<'a>(
        &self,
        pkg: &PackageId,
        dependencies: impl IntoIterator<Item = &'a PackageId>,
    ) -> Result<Option<BuildFailure>, LedgerError> {
        for dep in dependencies {
            let result = self.get(dep).ok_or_else(|| LedgerError::Unrecorded {
                package: pkg.clone(),
                dependency: dep.clone(),
            })?;
            if !satisfies_dependents(result) {
                return Ok(Some(BuildFailure::DependentFailed(dep.clone())));
            }
        }
        Ok(None)
    }

    /// Records `DependentFailed` for everything downstream of `failed`.
    ///
    /// Dependents are visited in build order and each one names its own
    /// direct dependency that failed, which is not always `failed` itself.
    /// Packages that already have a result are left alone. Returns the
    /// packages newly marked.
    pub fn fail_dependents(
        &mut self,
        graph: &DependencyGraph,
        failed: &PackageId,
    ) -> Result<Vec<PackageId>, LedgerError> {
        let downstream = graph.transitive_dependents(failed)?;
        let mut marked = Vec::new();
        for pkg in graph.build_order()? {
            if self.results.contains_key(&pkg) || downstream.binary_search(&pkg).is_err() {
                continue;
            }
            let blocker = graph
                .dependencies_of(&pkg)?
                .into_iter()
                .find(|dep| self.get(dep).is_some_and(|r| !satisfies_dependents(r)));
            if let Some(blocker) = blocker {
                info!(
                    package = %pkg,
                    dependency = %blocker,
                    "skipping package: dependency failed"
                );
                self.results
                    .insert(pkg.clone(), Err(BuildFailure::DependentFailed(blocker)));
                marked.push(pkg);
            }
        }
        Ok(marked)
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total: self.results.len() as u64,
            ..LedgerSummary::default()
        };
        for result in self.results.values() {
            match result {
                Ok(success) => {
                    summary.succeeded += 1;
                    if success.installed.is_some() {
                        summary.installed += 1;
                    }
                    if success.docs == DocsResult::Failed {
                        summary.docs_failed += 1;
                    }
                }
                Err(failure) => {
                    *summary.failed_by_stage.entry(failure.stage()).or_default() += 1;
                }
            }
        }
        summary
    }
}
