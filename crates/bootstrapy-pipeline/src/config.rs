//! Path configuration and pipeline settings.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::PipelineError;
use crate::glob::join_glob;

/// Template variables handed to every HTML page.
pub type TemplateData = BTreeMap<String, serde_json::Value>;

/// Logical asset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Html,
    Styles,
    Scripts,
    Images,
    Fonts,
}

impl Category {
    /// Every category, in build order.
    pub const ALL: [Category; 5] = [
        Category::Html,
        Category::Styles,
        Category::Scripts,
        Category::Images,
        Category::Fonts,
    ];

    /// Lowercase name used in config files and log lines.
    pub fn name(self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Images => "images",
            Category::Fonts => "fonts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input glob and output directory for one category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryPaths {
    /// Glob selecting the entry files, relative to the project root
    pub input: String,

    /// Glob selecting the files whose changes trigger a rebuild
    /// (defaults to `input`)
    #[serde(default)]
    pub watch: Option<String>,

    /// Output directory, relative to the project root
    pub output: PathBuf,
}

impl CategoryPaths {
    fn new(input: String, output: PathBuf) -> Self {
        Self {
            input,
            watch: None,
            output,
        }
    }

    /// Glob used by the watcher for this category.
    pub fn watch_glob(&self) -> &str {
        self.watch.as_deref().unwrap_or(&self.input)
    }
}

/// Mapping from asset categories to input globs and output directories.
///
/// Loaded once at startup and passed to whatever needs it. Categories
/// missing from a config file are laid out under its `input` and `output`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PathTable")]
pub struct PathConfig {
    /// Root of the source tree
    pub input: PathBuf,

    /// Root of the generated tree; removed wholesale by `clean`
    pub output: PathBuf,

    pub html: CategoryPaths,
    pub styles: CategoryPaths,
    pub scripts: CategoryPaths,
    pub images: CategoryPaths,
    pub fonts: CategoryPaths,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::with_roots("src", "dist")
    }
}

/// `[paths]` as written in a config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct PathTable {
    input: PathBuf,
    output: PathBuf,
    html: Option<CategoryPaths>,
    styles: Option<CategoryPaths>,
    scripts: Option<CategoryPaths>,
    images: Option<CategoryPaths>,
    fonts: Option<CategoryPaths>,
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            input: PathBuf::from("src"),
            output: PathBuf::from("dist"),
            html: None,
            styles: None,
            scripts: None,
            images: None,
            fonts: None,
        }
    }
}

impl From<PathTable> for PathConfig {
    fn from(table: PathTable) -> Self {
        let stock = PathConfig::with_roots(table.input, table.output);
        PathConfig {
            html: table.html.unwrap_or(stock.html),
            styles: table.styles.unwrap_or(stock.styles),
            scripts: table.scripts.unwrap_or(stock.scripts),
            images: table.images.unwrap_or(stock.images),
            fonts: table.fonts.unwrap_or(stock.fonts),
            ..stock
        }
    }
}

impl PathConfig {
    /// The stock layout under the given source and output roots.
    pub fn with_roots(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = output.into();
        let assets_in = input.join("assets");
        let assets_out = output.join("assets");

        Self {
            html: CategoryPaths {
                watch: Some(join_glob(&input, "**/*.html")),
                ..CategoryPaths::new(join_glob(&input, "*.html"), output.clone())
            },
            styles: CategoryPaths::new(
                join_glob(&assets_in.join("scss"), "**/*.scss"),
                assets_out.join("css"),
            ),
            scripts: CategoryPaths::new(
                join_glob(&assets_in.join("js"), "**/*.js"),
                assets_out.join("js"),
            ),
            images: CategoryPaths::new(
                join_glob(&assets_in.join("images"), "**/*.*"),
                assets_out.join("images"),
            ),
            fonts: CategoryPaths::new(
                join_glob(&assets_in.join("fonts"), "**/*.*"),
                assets_out.join("fonts"),
            ),
            input,
            output,
        }
    }

    /// Paths for a single category.
    pub fn category(&self, category: Category) -> &CategoryPaths {
        match category {
            Category::Html => &self.html,
            Category::Styles => &self.styles,
            Category::Scripts => &self.scripts,
            Category::Images => &self.images,
            Category::Fonts => &self.fonts,
        }
    }

    /// Union of the globs the watcher subscribes to.
    pub fn watch_globs(&self) -> Vec<String> {
        let mut globs: Vec<String> = Vec::new();
        for category in Category::ALL {
            let glob = self.category(category).watch_glob();
            if !globs.iter().any(|g| g == glob) {
                globs.push(glob.to_string());
            }
        }
        globs
    }

    /// Reject layouts where building or cleaning would clobber sources.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let input = normalize(&self.input);
        let output = normalize(&self.output);

        if output.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "output directory must not be the project root".to_string(),
            ));
        }

        if input.starts_with(&output) || output.starts_with(&input) {
            return Err(PipelineError::Config(format!(
                "input '{}' and output '{}' must not contain each other",
                self.input.display(),
                self.output.display()
            )));
        }

        for category in Category::ALL {
            let dir = normalize(&self.category(category).output);
            if !dir.starts_with(&output) {
                return Err(PipelineError::Config(format!(
                    "{} output '{}' is outside the output root '{}'",
                    category,
                    dir.display(),
                    self.output.display()
                )));
            }
        }

        Ok(())
    }
}

/// Everything the pipeline needs besides the project root.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub paths: PathConfig,

    /// Variables available to HTML templates
    pub template_data: TemplateData,

    /// Browserslist queries used to autoprefix styles
    pub browsers: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            paths: PathConfig::default(),
            template_data: default_template_data(),
            browsers: default_browsers(),
        }
    }
}

/// Template variables of the stock theme.
pub fn default_template_data() -> TemplateData {
    let mut data = TemplateData::new();
    data.insert("version".to_string(), "1.0.0".into());
    data.insert("siteName".to_string(), "Bootstrapy Theme".into());
    data.insert("cssPrefix".to_string(), "app".into());
    data
}

pub fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

/// Lexically drop `.` components so `./dist` and `dist` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
