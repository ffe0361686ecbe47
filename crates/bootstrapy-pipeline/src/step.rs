//! Transform steps: glob in, chain, directory out.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::PipelineError;
use crate::glob::{GlobFilter, SourceFile};
use crate::transform::{Asset, Transform};

/// Result of running a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Number of files written
    pub files: usize,
}

/// A named unit of work that reads files matching a glob, runs them
/// through an ordered chain of transforms, and writes the results under
/// an output directory, preserving paths relative to the glob base.
pub struct TransformStep {
    name: String,
    filter: GlobFilter,
    output: PathBuf,
    chain: Vec<Box<dyn Transform>>,
}

impl fmt::Debug for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStep")
            .field("name", &self.name)
            .field("input", &self.filter.pattern())
            .field("output", &self.output)
            .field(
                "chain",
                &self.chain.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TransformStep {
    /// Create a step that copies files matching `input` into `output`.
    pub fn new(
        name: impl Into<String>,
        input: &str,
        output: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        Self::with_exclude::<&str>(name, input, &[], output)
    }

    /// Like [`TransformStep::new`], skipping files matching any of `exclude`.
    pub fn with_exclude<S: AsRef<str>>(
        name: impl Into<String>,
        input: &str,
        exclude: &[S],
        output: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            name: name.into(),
            filter: GlobFilter::new(input, exclude)?,
            output: output.into(),
            chain: Vec::new(),
        })
    }

    /// Append a transform to the chain.
    pub fn then(mut self, transform: impl Transform + 'static) -> Self {
        self.chain.push(Box::new(transform));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run the step against the project at `root`.
    ///
    /// Every file is transformed before anything is written, so a failure
    /// leaves the output directory exactly as it was.
    pub fn run(&self, root: &Path) -> Result<StepReport, PipelineError> {
        let files = self.filter.collect(root, &self.name)?;

        let assets = files
            .par_iter()
            .map(|file| self.process(file))
            .collect::<Result<Vec<_>, _>>()?;

        let output_dir = root.join(&self.output);
        for asset in &assets {
            let target = output_dir.join(&asset.relative);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| PipelineError::filesystem(&self.name, parent, e))?;
            }

            fs::write(&target, &asset.contents)
                .map_err(|e| PipelineError::filesystem(&self.name, &target, e))?;

            tracing::debug!(
                "'{}': {} -> {}",
                self.name,
                asset.source.display(),
                target.display()
            );
        }

        Ok(StepReport {
            files: assets.len(),
        })
    }

    /// Read one file and push it through the chain.
    fn process(&self, file: &SourceFile) -> Result<Asset, PipelineError> {
        let contents = fs::read(&file.path)
            .map_err(|e| PipelineError::filesystem(&self.name, &file.path, e))?;

        let asset = Asset::new(&file.path, &file.relative, contents);

        self.chain
            .iter()
            .try_fold(asset, |asset, transform| transform.apply(asset))
            .map_err(|source| PipelineError::Transform {
                step: self.name.clone(),
                path: file.path.clone(),
                source,
            })
    }
}
