//! Configuration file loading for srcplan.
//!
//! Discovers and loads `srcplan.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use srcplan_types::description::VersionRange;
use srcplan_types::identity::PackageName;
use srcplan_types::repo::{RemoteRepo, Repo};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use url::Url;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "srcplan.toml";

/// Cache directory used when neither the file nor the CLI names one.
pub const DEFAULT_CACHE_DIR: &str = ".srcplan/cache";

/// Top-level configuration from srcplan.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SrcplanConfig {
    pub cache: CacheConfig,

    pub network: NetworkConfig,

    /// Package repositories, in priority order.
    pub repository: Vec<RepositoryConfig>,

    /// Soft version preferences: package name to version range text.
    pub preferences: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the per-repository download caches.
    pub dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Hosts that serve the same repository over both http and https.
    pub dual_protocol_hosts: Vec<String>,
}

/// One `[[repository]]` table. Exactly one of `url` and `dir` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: Option<String>,
    pub dir: Option<Utf8PathBuf>,
    pub secure: bool,
    pub root_keys: Vec<String>,
    pub key_threshold: u32,
}

impl RepositoryConfig {
    /// Builds the repository this table describes.
    ///
    /// Remote repositories are cached under `cache_root/<name>`.
    pub fn to_repo(
        &self,
        cache_root: &Utf8Path,
        dual_protocol_hosts: &[String],
    ) -> anyhow::Result<Repo> {
        match (&self.url, &self.dir) {
            (Some(url), None) => {
                let uri = Url::parse(url)
                    .with_context(|| format!("repository '{}': invalid url {}", self.name, url))?;
                let mut remote = RemoteRepo::empty(self.name.clone(), uri);
                remote.secure = self.secure;
                remote.root_keys = self.root_keys.clone();
                remote.key_threshold = self.key_threshold;
                let remote = remote.with_https_probe(dual_protocol_hosts);
                remote.validate()?;
                Ok(Repo::Remote {
                    cache_dir: cache_root.join(&self.name),
                    remote,
                })
            }
            (None, Some(dir)) => {
                if self.name.trim().is_empty() {
                    anyhow::bail!("local repository at {} has no name", dir);
                }
                if self.secure || !self.root_keys.is_empty() || self.key_threshold > 0 {
                    anyhow::bail!(
                        "repository '{}': security settings only apply to remote repositories",
                        self.name
                    );
                }
                Ok(Repo::Local { dir: dir.clone() })
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("repository '{}': set either url or dir, not both", self.name)
            }
            (None, None) => anyhow::bail!("repository '{}': needs a url or a dir", self.name),
        }
    }
}

/// Discover the srcplan.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a srcplan.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<SrcplanConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<SrcplanConfig> {
    let config: SrcplanConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<SrcplanConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(SrcplanConfig::default()),
    }
}

/// Settings after the config file and CLI arguments are combined and checked.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub cache_dir: Utf8PathBuf,
    pub repos: Vec<Repo>,
    pub preferences: BTreeMap<PackageName, VersionRange>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: SrcplanConfig,
}

impl ConfigMerger {
    pub fn new(config: SrcplanConfig) -> Self {
        Self { config }
    }

    /// CLI `cache_dir` replaces the file's; CLI preferences (`name=range`)
    /// replace file preferences for the same package.
    pub fn merge(
        self,
        root: &Utf8Path,
        cli_cache_dir: Option<Utf8PathBuf>,
        cli_preferences: &[String],
    ) -> anyhow::Result<MergedConfig> {
        let cache_dir = cli_cache_dir
            .or(self.config.cache.dir)
            .unwrap_or_else(|| root.join(DEFAULT_CACHE_DIR));

        let hosts = &self.config.network.dual_protocol_hosts;
        let mut names = BTreeSet::new();
        let mut repos = Vec::with_capacity(self.config.repository.len());
        for entry in &self.config.repository {
            if !names.insert(entry.name.as_str()) {
                anyhow::bail!("repository '{}' is configured twice", entry.name);
            }
            repos.push(entry.to_repo(&cache_dir, hosts)?);
        }

        let mut preferences = BTreeMap::new();
        for (name, range) in &self.config.preferences {
            let (name, range) = parse_preference(name, range)?;
            preferences.insert(name, range);
        }
        for (name, range) in parse_cli_preferences(cli_preferences)? {
            preferences.insert(name, range);
        }

        debug!(
            cache_dir = %cache_dir,
            repos = repos.len(),
            preferences = preferences.len(),
            "merged config"
        );
        Ok(MergedConfig {
            cache_dir,
            repos,
            preferences,
        })
    }
}

fn parse_preference(name: &str, range: &str) -> anyhow::Result<(PackageName, VersionRange)> {
    let name = PackageName::new(name.trim())
        .with_context(|| format!("invalid preference '{}'", name))?;
    let range = range
        .parse::<VersionRange>()
        .with_context(|| format!("invalid preference range for {}", name))?;
    Ok((name, range))
}

/// Parse CLI preferences from name=range strings.
pub fn parse_cli_preferences(
    entries: &[String],
) -> anyhow::Result<Vec<(PackageName, VersionRange)>> {
    let mut out = Vec::new();
    for entry in entries {
        let (name, range) = entry.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("invalid preference '{}': expected name=range", entry)
        })?;
        if range.trim().is_empty() {
            anyhow::bail!("invalid preference '{}': missing range", entry);
        }
        out.push(parse_preference(name, range.trim())?);
    }
    Ok(out)
}
