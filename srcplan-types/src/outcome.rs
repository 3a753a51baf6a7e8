//! How an attempt to build one package ended.
//!
//! Test failures abort the result (`BuildFailure::TestsFailed`) while
//! documentation failures are only recorded on the success
//! (`DocsResult::Failed`): tests gate a release, docs do not.

use crate::configured::InstalledPackageInfo;
use crate::identity::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseKind {
    Io,
    Network,
    Process,
    Parse,
    Other,
}

/// The underlying failure reported by a stage, kept verbatim.
///
/// `chain` holds the source errors below `message`, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FailureCause {
    pub kind: CauseKind,
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl FailureCause {
    pub fn new(kind: CauseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Captures `err` and every error in its source chain.
    pub fn from_error(kind: CauseKind, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(e) = source {
            chain.push(e.to_string());
            source = e.source();
        }
        Self {
            kind,
            message: err.to_string(),
            chain,
        }
    }

    /// `message: cause: cause ...`
    pub fn render(&self) -> String {
        std::iter::once(self.message.as_str())
            .chain(self.chain.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(": ")
    }
}

impl From<std::io::Error> for FailureCause {
    fn from(err: std::io::Error) -> Self {
        FailureCause::from_error(CauseKind::Io, &err)
    }
}

/// Stage of a build attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Planning,
    Dependencies,
    Download,
    Unpack,
    Configure,
    Build,
    Tests,
    Install,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStage::Planning => "planning",
            BuildStage::Dependencies => "dependencies",
            BuildStage::Download => "download",
            BuildStage::Unpack => "unpack",
            BuildStage::Configure => "configure",
            BuildStage::Build => "build",
            BuildStage::Tests => "tests",
            BuildStage::Install => "install",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cause", rename_all = "snake_case")]
pub enum BuildFailure {
    #[error("planning failed")]
    PlanningFailed,

    /// A prerequisite failed first; this package was never attempted.
    #[error("dependency {0} failed")]
    DependentFailed(PackageId),

    #[error("download failed: {0}")]
    DownloadFailed(FailureCause),

    #[error("unpack failed: {0}")]
    UnpackFailed(FailureCause),

    #[error("configure failed: {0}")]
    ConfigureFailed(FailureCause),

    #[error("build failed: {0}")]
    BuildFailed(FailureCause),

    #[error("tests failed: {0}")]
    TestsFailed(FailureCause),

    #[error("install failed: {0}")]
    InstallFailed(FailureCause),
}

impl BuildFailure {
    /// Wraps a stage's failure. `Planning` and `Dependencies` carry no cause
    /// and are built directly.
    pub fn at(stage: BuildStage, cause: FailureCause) -> Option<Self> {
        let failure = match stage {
            BuildStage::Planning | BuildStage::Dependencies => return None,
            BuildStage::Download => BuildFailure::DownloadFailed(cause),
            BuildStage::Unpack => BuildFailure::UnpackFailed(cause),
            BuildStage::Configure => BuildFailure::ConfigureFailed(cause),
            BuildStage::Build => BuildFailure::BuildFailed(cause),
            BuildStage::Tests => BuildFailure::TestsFailed(cause),
            BuildStage::Install => BuildFailure::InstallFailed(cause),
        };
        Some(failure)
    }

    pub fn stage(&self) -> BuildStage {
        match self {
            BuildFailure::PlanningFailed => BuildStage::Planning,
            BuildFailure::DependentFailed(_) => BuildStage::Dependencies,
            BuildFailure::DownloadFailed(_) => BuildStage::Download,
            BuildFailure::UnpackFailed(_) => BuildStage::Unpack,
            BuildFailure::ConfigureFailed(_) => BuildStage::Configure,
            BuildFailure::BuildFailed(_) => BuildStage::Build,
            BuildFailure::TestsFailed(_) => BuildStage::Tests,
            BuildFailure::InstallFailed(_) => BuildStage::Install,
        }
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            BuildFailure::PlanningFailed | BuildFailure::DependentFailed(_) => None,
            BuildFailure::DownloadFailed(c)
            | BuildFailure::UnpackFailed(c)
            | BuildFailure::ConfigureFailed(c)
            | BuildFailure::BuildFailed(c)
            | BuildFailure::TestsFailed(c)
            | BuildFailure::InstallFailed(c) => Some(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocsResult {
    #[default]
    NotTried,
    Failed,
    Ok,
}

/// There is no failed variant: failing tests end in `BuildFailure::TestsFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestsResult {
    #[default]
    NotTried,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildSuccess {
    #[serde(default)]
    pub docs: DocsResult,

    #[serde(default)]
    pub tests: TestsResult,

    /// Present iff the package produced something installable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<InstalledPackageInfo>,
}

impl BuildSuccess {
    pub fn new(
        docs: DocsResult,
        tests: TestsResult,
        installed: Option<InstalledPackageInfo>,
    ) -> Self {
        Self {
            docs,
            tests,
            installed,
        }
    }

    pub fn installed(&self) -> Option<&InstalledPackageInfo> {
        self.installed.as_ref()
    }
}

pub type BuildResult = Result<BuildSuccess, BuildFailure>;
