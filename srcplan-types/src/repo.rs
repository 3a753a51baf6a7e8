use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("repository '{name}': key threshold {threshold} exceeds the {keys} configured root keys")]
    ThresholdExceedsKeys {
        name: String,
        threshold: u32,
        keys: usize,
    },

    #[error("repository '{name}' is not secure but has root keys or a key threshold configured")]
    KeysOnInsecure { name: String },

    #[error("repository name must not be empty")]
    EmptyName,
}

/// A remote package repository.
///
/// `root_keys` and `key_threshold` only matter for secure repositories: they
/// are the trust anchors used while bootstrapping, and the number of them
/// that must have signed the initial root metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    pub uri: Url,

    #[serde(default)]
    pub secure: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_keys: Vec<String>,

    #[serde(default)]
    pub key_threshold: u32,

    /// Try `https` before the configured `http` URI. Derived, never stored.
    #[serde(skip)]
    pub should_try_https: bool,
}

impl RemoteRepo {
    /// An insecure repository with no keys; fill in the rest field by field.
    pub fn empty(name: impl Into<String>, uri: Url) -> Self {
        Self {
            name: name.into(),
            uri,
            secure: false,
            root_keys: Vec::new(),
            key_threshold: 0,
            should_try_https: false,
        }
    }

    /// Recomputes `should_try_https`: only plain `http` URIs on hosts known to
    /// serve both protocols qualify.
    pub fn with_https_probe<S: AsRef<str>>(mut self, dual_protocol_hosts: &[S]) -> Self {
        let host = self.uri.host_str().unwrap_or_default();
        self.should_try_https = self.uri.scheme() == "http"
            && dual_protocol_hosts
                .iter()
                .any(|h| h.as_ref().eq_ignore_ascii_case(host));
        self
    }

    pub fn validate(&self) -> Result<(), RepoError> {
        if self.name.trim().is_empty() {
            return Err(RepoError::EmptyName);
        }
        if !self.secure {
            if !self.root_keys.is_empty() || self.key_threshold > 0 {
                return Err(RepoError::KeysOnInsecure {
                    name: self.name.clone(),
                });
            }
            return Ok(());
        }
        if self.key_threshold as usize > self.root_keys.len() {
            return Err(RepoError::ThresholdExceedsKeys {
                name: self.name.clone(),
                threshold: self.key_threshold,
                keys: self.root_keys.len(),
            });
        }
        Ok(())
    }
}

/// Where packages come from: a plain directory or a remote with a local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Repo {
    Local {
        dir: Utf8PathBuf,
    },
    Remote {
        remote: RemoteRepo,
        cache_dir: Utf8PathBuf,
    },
}

impl Repo {
    pub fn remote_of(&self) -> Option<&RemoteRepo> {
        remote_of(self)
    }

    /// The local directory packages are read from or cached in.
    pub fn dir(&self) -> &Utf8Path {
        match self {
            Repo::Local { dir } => dir,
            Repo::Remote { cache_dir, .. } => cache_dir,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Repo::Local { .. })
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repo::Local { dir } => write!(f, "local:{dir}"),
            Repo::Remote { remote, .. } => write!(f, "{} ({})", remote.name, remote.uri),
        }
    }
}

/// The remote descriptor of `repo`, if it has one.
pub fn remote_of(repo: &Repo) -> Option<&RemoteRepo> {
    match repo {
        Repo::Remote { remote, .. } => Some(remote),
        Repo::Local { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    #[test]
    fn empty_remote_repo_is_insecure_without_keys() {
        let repo = RemoteRepo::empty("main", url("http://packages.example.org/"));
        assert!(!repo.secure);
        assert!(repo.root_keys.is_empty());
        assert_eq!(repo.key_threshold, 0);
        assert!(!repo.should_try_https);
        assert!(repo.validate().is_ok());
    }

    #[test]
    fn https_probe_only_applies_to_known_http_hosts() {
        let hosts = ["packages.example.org"];
        let plain =
            RemoteRepo::empty("main", url("http://packages.example.org/")).with_https_probe(&hosts[..]);
        assert!(plain.should_try_https);

        let other =
            RemoteRepo::empty("other", url("http://mirror.example.net/")).with_https_probe(&hosts[..]);
        assert!(!other.should_try_https);

        let tls =
            RemoteRepo::empty("tls", url("https://packages.example.org/")).with_https_probe(&hosts[..]);
        assert!(!tls.should_try_https);
    }

    #[test]
    fn validate_rejects_threshold_above_key_count() {
        let mut repo = RemoteRepo::empty("main", url("https://packages.example.org/"));
        repo.secure = true;
        repo.root_keys = vec!["aa11".to_string()];
        repo.key_threshold = 2;
        assert!(matches!(
            repo.validate(),
            Err(RepoError::ThresholdExceedsKeys { keys: 1, .. })
        ));

        repo.key_threshold = 1;
        assert!(repo.validate().is_ok());
    }

    #[test]
    fn validate_rejects_keys_on_insecure_repo() {
        let mut repo = RemoteRepo::empty("main", url("https://packages.example.org/"));
        repo.root_keys = vec!["aa11".to_string()];
        assert!(matches!(repo.validate(), Err(RepoError::KeysOnInsecure { .. })));
    }

    #[test]
    fn https_probe_is_not_serialized() {
        let repo = RemoteRepo::empty("main", url("http://packages.example.org/"))
            .with_https_probe(&["packages.example.org"][..]);
        let value = serde_json::to_value(&repo).expect("serialize");
        assert!(value.get("should_try_https").is_none());

        let back: RemoteRepo = serde_json::from_value(value).expect("deserialize");
        assert!(!back.should_try_https);
    }
}
