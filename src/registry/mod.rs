mod version;
#[cfg(test)]
mod tests;

pub use version::{Comparator, Op, PreIdentifier, Version, VersionError, VersionReq};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrateVersion {
    pub version: Version,
    pub is_yanked: bool,
    pub features: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrateInfo {
    pub versions: Vec<CrateVersion>,
}

impl CrateInfo {
    /// The newest listed version satisfying `req`, yanked releases included.
    pub fn best_match(&self, req: &VersionReq) -> Option<&CrateVersion> {
        self.versions
            .iter()
            .filter(|entry| req.matches(&entry.version))
            .max_by(|a, b| a.version.cmp(&b.version))
    }
}

/// Where crate metadata comes from.
pub trait CrateRegistry {
    fn lookup(&self, name: &str) -> Option<CrateInfo>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry index {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry index: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    #[error("Crate {name} not found")]
    CrateNotFound { name: String },
    #[error("No version found matching {req}")]
    NoMatchingVersion { req: String },
    #[error(transparent)]
    InvalidRequirement(#[from] VersionError),
}

#[derive(Deserialize)]
struct IndexFile {
    #[serde(default, rename = "crate")]
    crates: Vec<IndexEntry>,
}

#[derive(Deserialize)]
struct IndexEntry {
    name: String,
    #[serde(default)]
    versions: Vec<IndexVersion>,
}

#[derive(Deserialize)]
struct IndexVersion {
    version: String,
    #[serde(default)]
    yanked: bool,
    #[serde(default)]
    features: Vec<String>,
}

impl IndexEntry {
    /// Entries whose version does not parse are left out.
    fn into_info(self) -> (String, CrateInfo) {
        let name = self.name;
        let versions = self
            .versions
            .into_iter()
            .filter_map(|entry| match Version::parse(&entry.version) {
                Ok(version) => Some(CrateVersion {
                    version,
                    is_yanked: entry.yanked,
                    features: entry.features,
                }),
                Err(err) => {
                    debug!(target: "rustpath::registry", krate = %name, %err, "skipping index entry");
                    None
                }
            })
            .collect();
        (name, CrateInfo { versions })
    }
}

/// A registry held in memory, optionally loaded from a TOML index:
///
/// ```toml
/// [[crate]]
/// name = "serde"
/// versions = [{ version = "1.0.0" }, { version = "1.0.1", yanked = true }]
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    crates: FxHashMap<String, CrateInfo>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, info: CrateInfo) {
        self.crates.insert(name.into(), info);
    }

    pub fn from_toml(text: &str) -> Result<Self, RegistryError> {
        let index: IndexFile = toml::from_str(text)?;
        let mut registry = Self::new();
        for entry in index.crates {
            let (name, info) = entry.into_info();
            registry.insert(name, info);
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn len(&self) -> usize {
        self.crates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crates.is_empty()
    }
}

impl CrateRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str) -> Option<CrateInfo> {
        self.crates.get(name).cloned()
    }
}

/// Checks a dependency declaration against the registry and returns the
/// version it would pick.
pub fn check_dependency(
    registry: &dyn CrateRegistry,
    name: &str,
    req: &str,
) -> Result<CrateVersion, DependencyIssue> {
    let parsed = VersionReq::parse(req)?;
    let info = registry
        .lookup(name)
        .ok_or_else(|| DependencyIssue::CrateNotFound {
            name: name.to_string(),
        })?;
    let picked = info
        .best_match(&parsed)
        .cloned()
        .ok_or_else(|| DependencyIssue::NoMatchingVersion {
            req: req.to_string(),
        })?;
    debug!(target: "rustpath::registry", name, req, version = %picked.version, "dependency resolved");
    Ok(picked)
}
