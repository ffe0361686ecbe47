//! Pipeline wiring: path configuration in, task graph out.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::assets::{Autoprefix, CompileScss, MinifyCss, MinifyJs, RenameSuffix};
use crate::clean::CleanTask;
use crate::config::{PathConfig, PipelineSettings};
use crate::error::PipelineError;
use crate::glob::{glob_base, join_glob};
use crate::graph::{GraphError, RunReport, TaskGraph};
use crate::step::TransformStep;
use crate::templates::{RemoveEmptyLines, RenderTemplate};

/// Suffix given to minified outputs.
pub const MIN_SUFFIX: &str = ".min";

/// Tasks re-run on every watched change.
pub const REBUILD_TARGETS: &[&str] = &["html", "scss", "js", "images", "fonts"];

/// Entry points exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportedTask {
    /// Build html/styles/scripts/images, then watch and serve
    Default,
    /// Build every category, then watch and serve
    Watch,
    /// Clean, then build every category with minified styles and scripts
    Build,
    Html,
    Scss,
    MinifyCss,
    Js,
    MinifyJs,
    Images,
    Fonts,
    Clean,
}

impl ExportedTask {
    pub const ALL: [ExportedTask; 11] = [
        ExportedTask::Default,
        ExportedTask::Watch,
        ExportedTask::Build,
        ExportedTask::Html,
        ExportedTask::Scss,
        ExportedTask::MinifyCss,
        ExportedTask::Js,
        ExportedTask::MinifyJs,
        ExportedTask::Images,
        ExportedTask::Fonts,
        ExportedTask::Clean,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportedTask::Default => "default",
            ExportedTask::Watch => "watch",
            ExportedTask::Build => "build",
            ExportedTask::Html => "html",
            ExportedTask::Scss => "scss",
            ExportedTask::MinifyCss => "minifyCss",
            ExportedTask::Js => "js",
            ExportedTask::MinifyJs => "minifyJs",
            ExportedTask::Images => "images",
            ExportedTask::Fonts => "fonts",
            ExportedTask::Clean => "clean",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|task| task.name() == name)
    }

    /// Graph tasks making up this composition, in order.
    pub fn targets(self) -> &'static [&'static str] {
        match self {
            ExportedTask::Default => &["html", "scss", "js", "images"],
            ExportedTask::Watch => &["html", "scss", "js", "images", "fonts"],
            ExportedTask::Build => &["clean", "html", "minifyCss", "minifyJs", "images", "fonts"],
            ExportedTask::Html => &["html"],
            ExportedTask::Scss => &["scss"],
            ExportedTask::MinifyCss => &["minifyCss"],
            ExportedTask::Js => &["js"],
            ExportedTask::MinifyJs => &["minifyJs"],
            ExportedTask::Images => &["images"],
            ExportedTask::Fonts => &["fonts"],
            ExportedTask::Clean => &["clean"],
        }
    }

    /// Whether the task keeps running with the watcher and dev server.
    pub fn serves(self) -> bool {
        matches!(self, ExportedTask::Default | ExportedTask::Watch)
    }
}

impl fmt::Display for ExportedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A project's steps and their ordering, ready to run.
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    paths: PathConfig,
    graph: TaskGraph,
}

impl Pipeline {
    /// Validate the settings and build the task graph for a project root.
    pub fn new(root: impl Into<PathBuf>, settings: PipelineSettings) -> Result<Self, PipelineError> {
        let root = root.into();
        let paths = settings.paths;
        paths.validate()?;

        let prefixer = Autoprefix::new(&settings.browsers).map_err(|e| {
            PipelineError::Config(format!("[styles] browsers: {}", e))
        })?;

        let html = TransformStep::new("html", &paths.html.input, &paths.html.output)?
            .then(RenderTemplate::new(
                &root.join(glob_base(&paths.html.input)),
                settings.template_data,
            ))
            .then(RemoveEmptyLines);

        let scss = TransformStep::with_exclude(
            "scss",
            &paths.styles.input,
            &["**/_*.scss", "**/_*.sass"],
            &paths.styles.output,
        )?
        .then(CompileScss)
        .then(prefixer);

        let minify_css = TransformStep::with_exclude(
            "minifyCss",
            &join_glob(&paths.styles.output, "**/*.css"),
            &["**/*.min.css"],
            &paths.styles.output,
        )?
        .then(MinifyCss)
        .then(RenameSuffix::new(MIN_SUFFIX));

        let js = TransformStep::new("js", &paths.scripts.input, &paths.scripts.output)?;

        let minify_js = TransformStep::with_exclude(
            "minifyJs",
            &join_glob(&paths.scripts.output, "**/*.js"),
            &["**/*.min.js"],
            &paths.scripts.output,
        )?
        .then(MinifyJs)
        .then(RenameSuffix::new(MIN_SUFFIX));

        let images = TransformStep::new("images", &paths.images.input, &paths.images.output)?;
        let fonts = TransformStep::new("fonts", &paths.fonts.input, &paths.fonts.output)?;

        let graph = TaskGraph::builder()
            .task(CleanTask::new("clean", &paths.output), &[])
            .task(html, &[])
            .task(scss, &[])
            .task(minify_css, &["scss"])
            .task(js, &[])
            .task(minify_js, &["js"])
            .task(images, &[])
            .task(fonts, &[])
            .build()?;

        Ok(Self { root, paths, graph })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Globs whose changes should trigger [`Pipeline::rebuild`].
    pub fn watch_globs(&self) -> Vec<String> {
        self.paths.watch_globs()
    }

    /// Execution order of an exported task.
    pub fn plan(&self, task: ExportedTask) -> Result<Vec<&str>, GraphError> {
        self.graph.plan(task.targets())
    }

    /// Run an exported task's composition once.
    pub fn run(&self, task: ExportedTask) -> Result<RunReport, PipelineError> {
        tracing::debug!("running '{}' in {}", task, self.root.display());
        self.graph.run(task.targets(), &self.root)
    }

    /// Rebuild every category after a source change.
    pub fn rebuild(&self) -> Result<RunReport, PipelineError> {
        self.graph.run(REBUILD_TARGETS, &self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(root: &Path, path: &str) -> String {
        fs::read_to_string(root.join(path)).unwrap()
    }

    fn site() -> (tempfile::TempDir, Pipeline) {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(
            root,
            "src/index.html",
            "<html>\n<body>\n{% include \"partials/header.html\" %}\n\n{% if siteName %}\n<h1>{{ siteName }}</h1>\n{% endif %}\n</body>\n</html>\n",
        );
        write(root, "src/partials/header.html", "<header class=\"{{ cssPrefix }}-header\"></header>\n");
        write(root, "src/assets/scss/main.scss", "@import 'variables';\n.a{.b{color:$accent;}}\n");
        write(root, "src/assets/scss/_variables.scss", "$accent: red;\n");
        write(root, "src/assets/js/main.js", "function hello(name) {\n  return 'hi ' + name;\n}\nwindow.hello = hello;\n");
        write(root, "src/assets/images/logo.svg", "<svg></svg>");
        write(root, "src/assets/fonts/body.woff2", "font");

        let pipeline = Pipeline::new(root, PipelineSettings::default()).unwrap();
        (temp, pipeline)
    }

    fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = walkdir::WalkDir::new(root.join("dist"))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().strip_prefix(root).unwrap().display().to_string(),
                    fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn renders_pages_with_template_data() {
        let (temp, pipeline) = site();

        pipeline.run(ExportedTask::Html).unwrap();

        assert_eq!(
            read(temp.path(), "dist/index.html"),
            "<html>\n<body>\n<header class=\"app-header\"></header>\n<h1>Bootstrapy Theme</h1>\n</body>\n</html>\n"
        );
        assert!(!temp.path().join("dist/partials").exists());
    }

    #[test]
    fn build_compiles_and_minifies() {
        let (temp, pipeline) = site();
        let root = temp.path();

        let report = pipeline.run(ExportedTask::Build).unwrap();

        let names: Vec<_> = report.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["clean", "html", "scss", "minifyCss", "js", "minifyJs", "images", "fonts"]
        );

        let css = read(root, "dist/assets/css/main.css");
        assert!(css.contains(".a .b {"));
        assert!(css.contains("color: red"));
        assert!(!root.join("dist/assets/css/_variables.css").exists());

        let min_css = read(root, "dist/assets/css/main.min.css");
        assert!(min_css.contains(".a .b{color:red}"));

        assert!(root.join("dist/assets/js/main.js").exists());
        let min_js = read(root, "dist/assets/js/main.min.js");
        assert!(min_js.len() < read(root, "dist/assets/js/main.js").len());

        assert_eq!(read(root, "dist/assets/images/logo.svg"), "<svg></svg>");
        assert_eq!(read(root, "dist/assets/fonts/body.woff2"), "font");
    }

    #[test]
    fn build_is_idempotent() {
        let (temp, pipeline) = site();

        pipeline.run(ExportedTask::Build).unwrap();
        let first = snapshot(temp.path());
        pipeline.run(ExportedTask::Build).unwrap();
        let second = snapshot(temp.path());

        assert_eq!(first, second);
    }

    #[test]
    fn repeated_minify_does_not_stack_suffixes() {
        let (temp, pipeline) = site();

        pipeline.run(ExportedTask::MinifyCss).unwrap();
        pipeline.run(ExportedTask::MinifyCss).unwrap();

        assert!(!temp.path().join("dist/assets/css/main.min.min.css").exists());
    }

    #[test]
    fn clean_then_build_drops_deleted_sources() {
        let (temp, pipeline) = site();
        let root = temp.path();
        write(root, "src/assets/js/old.js", "var old = 1;");

        pipeline.run(ExportedTask::Build).unwrap();
        assert!(root.join("dist/assets/js/old.js").exists());

        fs::remove_file(root.join("src/assets/js/old.js")).unwrap();
        pipeline.run(ExportedTask::Build).unwrap();

        assert!(!root.join("dist/assets/js/old.js").exists());
        assert!(!root.join("dist/assets/js/old.min.js").exists());
    }

    #[test]
    fn clean_is_idempotent() {
        let (temp, pipeline) = site();

        pipeline.run(ExportedTask::Clean).unwrap();
        pipeline.run(ExportedTask::Clean).unwrap();

        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn minify_without_base_output_finds_nothing() {
        let (temp, pipeline) = site();

        let plan = pipeline.plan(ExportedTask::MinifyJs).unwrap();
        assert_eq!(plan, vec!["js", "minifyJs"]);

        match pipeline.graph().get("minifyJs") {
            Some(Task::Step(step)) => {
                assert_eq!(step.run(temp.path()).unwrap().files, 0);
            }
            other => panic!("unexpected task: {:?}", other),
        }
    }

    #[test]
    fn stylesheet_errors_abort_the_build() {
        let (temp, pipeline) = site();
        write(temp.path(), "src/assets/scss/broken.scss", ".a { color: $nope; }");

        let err = pipeline.run(ExportedTask::Build).unwrap_err();

        assert!(matches!(err, PipelineError::Transform { ref step, .. } if step == "scss"));
        assert!(!temp.path().join("dist/assets/js").exists());
    }

    #[test]
    fn rebuild_covers_every_category() {
        let (temp, pipeline) = site();

        let report = pipeline.rebuild().unwrap();

        assert_eq!(report.tasks.len(), REBUILD_TARGETS.len());
        assert!(temp.path().join("dist/assets/fonts/body.woff2").exists());
    }

    #[test]
    fn rebuild_picks_up_edited_partials() {
        let (temp, pipeline) = site();
        let root = temp.path();

        pipeline.rebuild().unwrap();
        assert!(read(root, "dist/index.html").contains("app-header"));

        write(root, "src/partials/header.html", "<header class=\"edited\"></header>\n");
        pipeline.rebuild().unwrap();

        let page = read(root, "dist/index.html");
        assert!(page.contains("<header class=\"edited\"></header>"));
        assert!(!page.contains("app-header"));
    }

    #[test]
    fn builds_into_a_moved_output_root() {
        let (temp, _) = site();
        let root = temp.path();
        let paths: PathConfig =
            serde_json::from_value(serde_json::json!({ "output": "public" })).unwrap();
        let settings = PipelineSettings {
            paths,
            ..PipelineSettings::default()
        };

        let pipeline = Pipeline::new(root, settings).unwrap();
        pipeline.run(ExportedTask::Build).unwrap();

        assert!(root.join("public/index.html").exists());
        assert!(root.join("public/assets/css/main.min.css").exists());
        assert!(root.join("public/assets/fonts/body.woff2").exists());
        assert!(!root.join("dist").exists());

        pipeline.run(ExportedTask::Clean).unwrap();
        assert!(!root.join("public").exists());
    }

    #[test]
    fn exported_task_table() {
        assert_eq!(ExportedTask::from_name("minifyCss"), Some(ExportedTask::MinifyCss));
        assert_eq!(ExportedTask::from_name("deploy"), None);
        assert!(ExportedTask::Default.serves());
        assert!(!ExportedTask::Build.serves());
        assert!(!ExportedTask::Default.targets().contains(&"fonts"));
        assert!(ExportedTask::Watch.targets().contains(&"fonts"));
    }

    #[test]
    fn rejects_invalid_browser_queries() {
        let temp = tempdir().unwrap();
        let settings = PipelineSettings {
            browsers: vec!["definitely not a browser".to_string()],
            ..PipelineSettings::default()
        };

        let err = Pipeline::new(temp.path(), settings).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
