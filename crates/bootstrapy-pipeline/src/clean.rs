//! Removal of the output tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Recursively deletes a directory. Missing directories are not an error.
#[derive(Debug, Clone)]
pub struct CleanTask {
    name: String,
    target: PathBuf,
}

impl CleanTask {
    pub fn new(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory removed by this task, relative to the project root.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Delete the target under `root`. Returns whether anything was removed.
    pub fn run(&self, root: &Path) -> Result<bool, PipelineError> {
        let path = root.join(&self.target);

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::debug!("'{}': removed {}", self.name, path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PipelineError::filesystem(&self.name, path, e)),
        }
    }
}
