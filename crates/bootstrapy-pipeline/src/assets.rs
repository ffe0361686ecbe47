//! Style and script transforms.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::transform::{Asset, Transform, TransformError};

/// Compiles SCSS to expanded CSS with grass.
///
/// Relative `@use`/`@import` paths resolve against the source file's directory.
#[derive(Debug, Default)]
pub struct CompileScss;

impl Transform for CompileScss {
    fn name(&self) -> &'static str {
        "scss"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let mut options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .input_syntax(grass::InputSyntax::Scss);

        if let Some(dir) = asset.source.parent() {
            options = options.load_path(dir);
        }

        let css = grass::from_string(asset.text()?.to_string(), &options)
            .map_err(|e| TransformError::Sass(e.to_string()))?;

        Ok(asset.with_text(css).with_extension("css"))
    }
}

/// Adds and removes vendor prefixes for a browserslist target.
#[derive(Debug)]
pub struct Autoprefix {
    browsers: Option<Browsers>,
}

impl Autoprefix {
    /// Resolve browserslist queries such as `"last 2 versions"`.
    pub fn new<S: AsRef<str>>(queries: &[S]) -> Result<Self, TransformError> {
        let browsers = Browsers::from_browserslist(queries.iter().map(|q| q.as_ref()))
            .map_err(|e| TransformError::Css(format!("invalid browserslist query: {}", e)))?;

        Ok(Self { browsers })
    }

    fn targets(&self) -> Targets {
        Targets {
            browsers: self.browsers.clone(),
            ..Targets::default()
        }
    }
}

impl Transform for Autoprefix {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let filename = asset.relative.display().to_string();
        let css = print_css(asset.text()?, filename, self.targets(), false)?;
        Ok(asset.with_text(css))
    }
}

/// Minifies CSS using lightningcss.
#[derive(Debug, Default)]
pub struct MinifyCss;

impl Transform for MinifyCss {
    fn name(&self) -> &'static str {
        "minify-css"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let filename = asset.relative.display().to_string();
        let css = print_css(asset.text()?, filename, Targets::default(), true)?;
        Ok(asset.with_text(css))
    }
}

/// Parse, optimise for `targets`, and print a stylesheet.
fn print_css(
    source: &str,
    filename: String,
    targets: Targets,
    minify: bool,
) -> Result<String, TransformError> {
    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename,
            ..ParserOptions::default()
        },
    )
    .map_err(|e| TransformError::Css(format!("parse error: {}", e)))?;

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    Ok(printed.code)
}

/// Compresses and mangles browser scripts with oxc.
///
/// Scripts are parsed as classic scripts, so top-level names stay intact.
#[derive(Debug, Default)]
pub struct MinifyJs;

impl Transform for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn apply(&self, asset: Asset) -> Result<Asset, TransformError> {
        let code = {
            let allocator = Allocator::default();
            let parsed = Parser::new(&allocator, asset.text()?, SourceType::cjs()).parse();
            if parsed.panicked || !parsed.errors.is_empty() {
                let message = parsed
                    .errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(TransformError::Script(message));
            }

            let mut program = parsed.program;
            let options = MinifierOptions {
                mangle: Some(MangleOptions::default()),
                compress: Some(CompressOptions::default()),
            };
            let minified = Minifier::new(options).build(&allocator, &mut program);

            let output = Codegen::new()
                .with_options(CodegenOptions {
                    minify: true,
                    ..CodegenOptions::default()
                })
                .with_scoping(minified.scoping)
                .build(&program);
            output.code
        };

        Ok(asset.with_text(code))
    }
}

/// Inserts a suffix before the extension: `main.css` becomes `main.min.css`.
#[derive(Debug)]
pub struct RenameSuffix {
    suffix: String,
}

impl RenameSuffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Transform for RenameSuffix {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let stem = asset
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_name = match asset.relative.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, self.suffix),
        };

        asset.relative.set_file_name(file_name);
        Ok(asset)
    }
}
