//! HTML page templating.

use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment};

use crate::config::TemplateData;
use crate::glob::to_slash;
use crate::transform::{Asset, Transform, TransformError};

/// Renders pages through minijinja with the site's template data.
///
/// Block tags are trimmed the way hand-written page templates expect:
/// the newline after a block tag is dropped and leading whitespace before
/// one is stripped.
///
/// Every page gets a fresh environment: the loader caches what it loads,
/// and partials must be re-read on each rebuild.
#[derive(Debug)]
pub struct RenderTemplate {
    base_dir: PathBuf,
    data: TemplateData,
}

impl RenderTemplate {
    /// Create a renderer whose `include`/`extends` lookups start at `base_dir`.
    pub fn new(base_dir: &Path, data: TemplateData) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            data,
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(path_loader(&self.base_dir));
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env
    }
}

impl Transform for RenderTemplate {
    fn name(&self) -> &'static str {
        "template"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let name = to_slash(&asset.relative);

        let html = self
            .environment()
            .render_named_str(&name, asset.text()?, &self.data)
            .map_err(|e| TransformError::Template(format!("{:#}", e)))?;

        Ok(asset.with_text(html))
    }
}

/// Drops blank and whitespace-only lines. Line endings are kept as found.
#[derive(Debug, Default)]
pub struct RemoveEmptyLines;

impl Transform for RemoveEmptyLines {
    fn name(&self) -> &'static str {
        "remove-empty-lines"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let text = asset.text()?;

        let out: String = text
            .split_inclusive('\n')
            .filter(|line| !line.trim().is_empty())
            .collect();

        Ok(asset.with_text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_template_data;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn page(text: &str) -> Asset {
        Asset::new("src/index.html", "index.html", text.as_bytes().to_vec())
    }

    #[test]
    fn substitutes_site_name() {
        let temp = tempdir().unwrap();
        let renderer = RenderTemplate::new(temp.path(), default_template_data());

        let out = renderer
            .apply(page("<title>{{ siteName }}</title>\n"))
            .unwrap();

        assert_eq!(out.text().unwrap(), "<title>Bootstrapy Theme</title>\n");
    }

    #[test]
    fn trims_block_tags() {
        let temp = tempdir().unwrap();
        let renderer = RenderTemplate::new(temp.path(), default_template_data());

        let source = "<ul>\n    {% for n in [1, 2] %}\n    <li>{{ n }}</li>\n    {% endfor %}\n</ul>\n";
        let out = renderer.apply(page(source)).unwrap();

        assert_eq!(
            out.text().unwrap(),
            "<ul>\n    <li>1</li>\n    <li>2</li>\n</ul>\n"
        );
    }

    #[test]
    fn resolves_partials_from_base_dir() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("partials")).unwrap();
        fs::write(
            temp.path().join("partials/footer.html"),
            "<footer>v{{ version }}</footer>",
        )
        .unwrap();

        let renderer = RenderTemplate::new(temp.path(), default_template_data());
        let out = renderer
            .apply(page("{% include \"partials/footer.html\" %}"))
            .unwrap();

        assert_eq!(out.text().unwrap(), "<footer>v1.0.0</footer>");
    }

    #[test]
    fn reports_syntax_errors() {
        let temp = tempdir().unwrap();
        let renderer = RenderTemplate::new(temp.path(), default_template_data());

        let err = renderer.apply(page("{% if %}")).unwrap_err();

        assert!(matches!(err, TransformError::Template(_)));
    }

    #[test]
    fn removes_blank_lines() {
        let out = RemoveEmptyLines
            .apply(page("<body>\n\n   \n\t<p>hi</p>\n\n</body>\n"))
            .unwrap();

        assert_eq!(out.text().unwrap(), "<body>\n\t<p>hi</p>\n</body>\n");
    }

    #[test]
    fn keeps_crlf_line_endings() {
        let out = RemoveEmptyLines
            .apply(page("<body>\r\n\r\n  <p>hi</p>\r\n</body>"))
            .unwrap();

        assert_eq!(out.text().unwrap(), "<body>\r\n  <p>hi</p>\r\n</body>");
    }

    #[test]
    fn rereads_partials_between_renders() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("partials")).unwrap();
        let partial = temp.path().join("partials/nav.html");
        let renderer = RenderTemplate::new(temp.path(), default_template_data());

        fs::write(&partial, "<nav>old</nav>").unwrap();
        let first = renderer.apply(page("{% include \"partials/nav.html\" %}")).unwrap();
        fs::write(&partial, "<nav>new</nav>").unwrap();
        let second = renderer.apply(page("{% include \"partials/nav.html\" %}")).unwrap();

        assert_eq!(first.text().unwrap(), "<nav>old</nav>");
        assert_eq!(second.text().unwrap(), "<nav>new</nav>");
    }

    #[test]
    fn empty_page_stays_empty() {
        let out = RemoveEmptyLines.apply(page("\n\n")).unwrap();
        assert_eq!(out.text().unwrap(), "");
    }
}
