//! Glob matching and input enumeration.
//!
//! Patterns are relative to the project root and always use `/` as the
//! separator. `*` stops at a separator, `**` crosses any number of them.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::PipelineError;

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// The literal directory prefix of a glob.
///
/// `src/assets/scss/**/*.scss` has base `src/assets/scss`; a literal path
/// such as `src/index.html` has its parent, `src`, as base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let literal = segments
        .iter()
        .position(|s| s.contains(GLOB_META))
        .unwrap_or_else(|| segments.len().saturating_sub(1));

    segments[..literal].iter().collect()
}

/// Append a glob suffix to a directory, e.g. `dist/assets/css` + `**/*.css`.
pub fn join_glob(dir: &Path, pattern: &str) -> String {
    let dir = to_slash(dir);
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        pattern.to_string()
    } else {
        format!("{}/{}", dir, pattern)
    }
}

/// Render a relative path with `/` separators for glob matching.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compile a list of patterns into one matcher.
pub fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, PipelineError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .map_err(|source| PipelineError::Glob {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }

    builder.build().map_err(|source| PipelineError::Glob {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(", "),
        source,
    })
}

/// A file selected by a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,

    /// Path relative to the glob base; mirrored under the output directory
    pub relative: PathBuf,
}

/// Include glob plus exclusions, compiled once.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    base: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl GlobFilter {
    pub fn new<S: AsRef<str>>(pattern: &str, exclude: &[S]) -> Result<Self, PipelineError> {
        Ok(Self {
            pattern: pattern.to_string(),
            base: glob_base(pattern),
            include: compile_globs(std::slice::from_ref(&pattern))?,
            exclude: compile_globs(exclude)?,
        })
    }

    /// The include pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a root-relative, `/`-separated path is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }

    /// Enumerate the selected files under `root`, sorted by path.
    ///
    /// A missing base directory selects nothing.
    pub fn collect(&self, root: &Path, step: &str) -> Result<Vec<SourceFile>, PipelineError> {
        let base_dir = root.join(&self.base);

        if !base_dir.is_dir() {
            tracing::warn!(
                "'{}': no input directory at {}, nothing to do",
                step,
                base_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&base_dir)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&base_dir).to_path_buf();
                PipelineError::filesystem(step, path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(from_root) = path.strip_prefix(root) else {
                continue;
            };

            if !self.matches(&to_slash(from_root)) {
                continue;
            }

            let relative = path
                .strip_prefix(&base_dir)
                .unwrap_or(from_root)
                .to_path_buf();

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative,
            });
        }

        Ok(files)
    }
}
