use crate::{
    config::ConfigError,
    language::errors::SyntaxErrors,
    registry::RegistryError,
    resolve::LoadError,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("cannot parse `{text}`: {source}")]
    Syntax {
        text: String,
        #[source]
        source: SyntaxErrors,
    },
    #[error("module `{path}` not found in {}", file.display())]
    ModuleNotFound { path: String, file: PathBuf },
    #[error("no registry index given and none configured in {config}")]
    NoRegistryIndex { config: &'static str },
    #[error("{count} diagnostic(s) reported")]
    DiagnosticsReported { count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
