use crate::identity::PackageId;
use crate::repo::Repo;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Where a package's sources live.
///
/// `L` is how the local copy of a downloaded package is represented. Only the
/// two download variants carry it: local directories and tarballs are already
/// on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackageLocation<L> {
    LocalUnpacked {
        path: Utf8PathBuf,
    },
    LocalTarball {
        path: Utf8PathBuf,
    },
    RemoteTarball {
        uri: Url,
        local: L,
    },
    RepoTarball {
        repo: Repo,
        package: PackageId,
        local: L,
    },
}

/// A location whose download (if any) may not have happened yet.
pub type UnresolvedPkgLoc = PackageLocation<Option<Utf8PathBuf>>;

/// A location with a concrete local path for every download variant.
pub type ResolvedPkgLoc = PackageLocation<Utf8PathBuf>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("{location} has not been fetched")]
    Unfetched { location: String },
}

impl<L> PackageLocation<L> {
    pub fn map_local<M>(self, f: impl FnOnce(L) -> M) -> PackageLocation<M> {
        match self {
            PackageLocation::LocalUnpacked { path } => PackageLocation::LocalUnpacked { path },
            PackageLocation::LocalTarball { path } => PackageLocation::LocalTarball { path },
            PackageLocation::RemoteTarball { uri, local } => PackageLocation::RemoteTarball {
                uri,
                local: f(local),
            },
            PackageLocation::RepoTarball {
                repo,
                package,
                local,
            } => PackageLocation::RepoTarball {
                repo,
                package,
                local: f(local),
            },
        }
    }

    pub fn local(&self) -> Option<&L> {
        match self {
            PackageLocation::RemoteTarball { local, .. }
            | PackageLocation::RepoTarball { local, .. } => Some(local),
            PackageLocation::LocalUnpacked { .. } | PackageLocation::LocalTarball { .. } => None,
        }
    }

    pub fn requires_download(&self) -> bool {
        matches!(
            self,
            PackageLocation::RemoteTarball { .. } | PackageLocation::RepoTarball { .. }
        )
    }

    pub fn repo(&self) -> Option<&Repo> {
        match self {
            PackageLocation::RepoTarball { repo, .. } => Some(repo),
            _ => None,
        }
    }
}

impl UnresolvedPkgLoc {
    /// Fills in the local path of a download variant.
    ///
    /// `fetched` wins over a path already recorded in the location.
    pub fn resolve(self, fetched: Option<Utf8PathBuf>) -> Result<ResolvedPkgLoc, LocationError> {
        if let Some(None) = self.local()
            && fetched.is_none()
        {
            return Err(LocationError::Unfetched {
                location: self.to_string(),
            });
        }
        Ok(self.map_local(|cached| fetched.or(cached).unwrap_or_default()))
    }
}

impl<L> fmt::Display for PackageLocation<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageLocation::LocalUnpacked { path } => write!(f, "directory {path}"),
            PackageLocation::LocalTarball { path } => write!(f, "tarball {path}"),
            PackageLocation::RemoteTarball { uri, .. } => write!(f, "remote tarball {uri}"),
            PackageLocation::RepoTarball { repo, package, .. } => {
                write!(f, "{package} from {repo}")
            }
        }
    }
}
