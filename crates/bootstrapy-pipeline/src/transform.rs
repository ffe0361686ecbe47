//! The transform contract shared by every step.

use std::path::PathBuf;

/// A file travelling through a transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Where the file was read from
    pub source: PathBuf,

    /// Destination relative to the step's output directory
    pub relative: PathBuf,

    /// Current contents
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents,
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents)
            .map_err(|_| TransformError::Encoding(self.source.display().to_string()))
    }

    /// Replace the contents with new text.
    pub fn with_text(self, text: String) -> Self {
        Self {
            contents: text.into_bytes(),
            ..self
        }
    }

    /// Change the extension of the destination path.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.relative.set_extension(ext);
        self
    }
}

/// Errors a transform can raise on malformed input.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Sass compilation error: {0}")]
    Sass(String),

    #[error("CSS error: {0}")]
    Css(String),

    #[error("JavaScript error: {0}")]
    Script(String),

    #[error("Not valid UTF-8: {0}")]
    Encoding(String),
}

/// A pure file-to-file transformation.
pub trait Transform: Send + Sync {
    /// Short identifier used in logs (e.g., "scss", "minify-css")
    fn name(&self) -> &'static str;

    /// Transform one asset. Must not touch the filesystem outside of
    /// reading imports.
    fn apply(&self, asset: Asset) -> Result<Asset, TransformError>;
}
