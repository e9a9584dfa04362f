use crate::language::errors::SyntaxError;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug)]
pub struct FileErrors {
    pub path: PathBuf,
    pub source: String,
    pub errors: Vec<SyntaxError>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("syntax errors in {} file(s)", .0.len())]
    Syntax(Vec<FileErrors>),
}

pub struct LoadedModule {
    pub path: PathBuf,
    pub source: String,
}

/// Supplies the files behind `mod name;` declarations.
pub trait ModuleLoader {
    /// `dir` is the directory that holds the children of the declaring module.
    fn load(&mut self, dir: &Path, name: &str) -> Result<Option<LoadedModule>, LoadError>;
}

/// Leaves out-of-line modules empty.
pub struct NoModuleFiles;

impl ModuleLoader for NoModuleFiles {
    fn load(&mut self, _dir: &Path, _name: &str) -> Result<Option<LoadedModule>, LoadError> {
        Ok(None)
    }
}

/// Reads `dir/name.rs`, falling back to `dir/name/mod.rs`.
#[derive(Default)]
pub struct DiskLoader;

impl ModuleLoader for DiskLoader {
    fn load(&mut self, dir: &Path, name: &str) -> Result<Option<LoadedModule>, LoadError> {
        let candidates = [dir.join(format!("{name}.rs")), dir.join(name).join("mod.rs")];
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|error| LoadError::Io {
                path: path.clone(),
                error,
            })?;
            return Ok(Some(LoadedModule { path, source }));
        }
        tracing::warn!(
            target: "rustpath::resolve",
            module = name,
            dir = %dir.display(),
            "module file not found"
        );
        Ok(None)
    }
}

pub fn read_source(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|error| LoadError::Io {
        path: path.to_path_buf(),
        error,
    })
}
