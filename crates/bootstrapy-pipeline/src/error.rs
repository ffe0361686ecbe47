//! Error types for the pipeline.

use std::path::PathBuf;

use crate::graph::GraphError;
use crate::transform::TransformError;

/// Errors that can occur while configuring or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A transform rejected its input; nothing was written for the step.
    #[error("'{step}' failed on {}: {source}", .path.display())]
    Transform {
        step: String,
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    /// Reading, writing or deleting a file failed.
    #[error("'{step}' failed at {}: {source}", .path.display())]
    Filesystem {
        step: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PipelineError {
    pub(crate) fn filesystem(
        step: &str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            step: step.to_string(),
            path: path.into(),
            source,
        }
    }
}
