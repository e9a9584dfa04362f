use crate::{analysis::CheckOptions, logging::LogSettings, render::RenderOptions};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE: &str = "rustpath.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderSection {
    pub render_lifetimes: bool,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            render_lifetimes: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// TOML crate index consulted for `[[dependency]]` version requirements.
    pub index: Option<PathBuf>,
}

/// An extra crate made visible to the analysed one.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Root file of the crate, relative to the config file.
    pub path: PathBuf,
    #[serde(default)]
    pub version: Option<String>,
}

/// Contents of `rustpath.toml`. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub render: RenderSection,
    pub lints: CheckOptions,
    pub log: LogSettings,
    pub registry: RegistrySection,
    #[serde(rename = "dependency")]
    pub dependencies: Vec<Dependency>,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        debug!(
            target: "rustpath::config",
            path = %path.display(),
            dependencies = config.dependencies.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Nearest `rustpath.toml` in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        let mut dir = if start.is_dir() {
            Some(start)
        } else {
            start.parent()
        };
        while let Some(current) = dir {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    /// Configuration governing `file`; defaults when none is found.
    pub fn for_file(file: &Path) -> Result<Self, ConfigError> {
        match Self::discover(file) {
            Some(path) => Self::load(&path),
            None => {
                debug!(target: "rustpath::config", file = %file.display(), "no configuration found");
                Ok(Self::default())
            }
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            render_lifetimes: self.render.render_lifetimes,
            ..RenderOptions::default()
        }
    }

    pub fn resolve_path(&self, relative: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if relative.is_relative() => base.join(relative),
            _ => relative.to_path_buf(),
        }
    }

    pub fn registry_index(&self) -> Option<PathBuf> {
        self.registry.index.as_deref().map(|index| self.resolve_path(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogFormat, LogLevel};
    use tempfile::tempdir;

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::from_toml_str("", Path::new("rustpath.toml")).expect("empty config");
        assert!(config.render.render_lifetimes);
        assert_eq!(config.lints, CheckOptions::default());
        assert!(config.log.is_empty());
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn sections_are_read() {
        let text = r#"
            [render]
            render-lifetimes = false

            [lints]
            unnecessary-qualifications = false

            [log]
            level = "debug"
            format = "json"

            [registry]
            index = "index.toml"

            [[dependency]]
            name = "shapes"
            path = "../shapes/lib.rs"
            version = "^1.2"
        "#;
        let config = Config::from_toml_str(text, Path::new("/work/app/rustpath.toml")).expect("config");
        assert!(!config.render_options().render_lifetimes);
        assert!(!config.lints.unnecessary_qualifications);
        assert!(config.lints.type_arguments);
        assert_eq!(config.log.level, Some(LogLevel::Debug));
        assert_eq!(config.log.format, Some(LogFormat::Json));
        assert_eq!(config.registry_index(), Some(PathBuf::from("/work/app/index.toml")));
        let dep = &config.dependencies[0];
        assert_eq!(dep.version.as_deref(), Some("^1.2"));
        assert_eq!(config.resolve_path(&dep.path), PathBuf::from("/work/app/../shapes/lib.rs"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[lint]\nfoo = 1\n", Path::new("rustpath.toml"))
            .expect_err("unknown section");
        assert!(matches!(err, ConfigError::Parse { .. }));
        let err = Config::from_toml_str("[log]\nlevel = \"loud\"\n", Path::new("rustpath.toml"))
            .expect_err("unknown level");
        assert!(err.to_string().contains("rustpath.toml"));
    }

    #[test]
    fn discovery_walks_up_from_the_file() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("src").join("inner");
        fs::create_dir_all(&nested).expect("dirs");
        let file = nested.join("lib.rs");
        fs::write(&file, "fn main() {}").expect("source");

        let defaults = Config::for_file(&file).expect("defaults");
        assert_eq!(defaults, Config::default());

        let config_path = dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "[render]\nrender-lifetimes = false\n").expect("config");
        assert_eq!(Config::discover(&file), Some(config_path));
        let config = Config::for_file(&file).expect("config");
        assert!(!config.render.render_lifetimes);
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));
    }
}
