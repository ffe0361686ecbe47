//! Loading `bootstrapy.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bootstrapy_pipeline::config::{default_browsers, default_template_data};
use bootstrapy_pipeline::{PathConfig, PipelineSettings, TemplateData};
use bootstrapy_server::DevServerConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "bootstrapy.toml";

/// Configuration file structure (bootstrapy.toml).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    paths: PathConfig,
    html: HtmlSection,
    styles: StylesSection,
    server: ServerSection,
    watch: WatchSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct HtmlSection {
    /// Merged over the stock template data
    data: TemplateData,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct StylesSection {
    browsers: Vec<String>,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerSection {
    host: String,
    port: u16,
    open: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = DevServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            open: defaults.open,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WatchSection {
    debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Resolved configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; every configured path is relative to it
    pub root: PathBuf,
    pub pipeline: PipelineSettings,
    pub server: DevServerConfig,
    pub debounce: Duration,
}

/// Directory that relative paths in a config file resolve against.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load configuration.
///
/// An explicit path must exist. The default file is optional; without it
/// the stock layout is used.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = explicit.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let root = config_root_dir(path);

    let file = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        file
    } else if explicit.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        ConfigFile::default()
    };

    Ok(resolve(root, file))
}

fn resolve(root: PathBuf, file: ConfigFile) -> Config {
    let mut template_data = default_template_data();
    template_data.extend(file.html.data);

    let server = DevServerConfig {
        root: root.join(&file.paths.output),
        host: file.server.host,
        port: file.server.port,
        open: file.server.open,
    };

    Config {
        pipeline: PipelineSettings {
            paths: file.paths,
            template_data,
            browsers: file.styles.browsers,
        },
        server,
        debounce: Duration::from_millis(file.watch.debounce_ms),
        root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_default_file_uses_stock_layout() {
        let config = resolve(PathBuf::from("."), ConfigFile::default());

        assert_eq!(config.pipeline.paths, PathConfig::default());
        assert_eq!(config.pipeline.template_data["siteName"], "Bootstrapy Theme");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.root, PathBuf::from("./dist"));
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn reads_sections() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bootstrapy.toml");
        fs::write(
            &path,
            r#"
[paths]
output = "public"

[paths.html]
input = "src/*.html"
output = "public"

[html.data]
siteName = "Acme"

[styles]
browsers = ["safari 8"]

[server]
port = 8080
open = false

[watch]
debounce_ms = 0
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(config.root, temp.path());
        assert_eq!(config.pipeline.paths.output, PathBuf::from("public"));
        assert_eq!(config.pipeline.template_data["siteName"], "Acme");
        assert_eq!(config.pipeline.template_data["cssPrefix"], "app");
        assert_eq!(config.pipeline.browsers, vec!["safari 8"]);
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.open);
        assert_eq!(config.server.root, temp.path().join("public"));
        assert_eq!(config.debounce, Duration::ZERO);
    }

    #[test]
    fn output_root_alone_moves_every_category() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bootstrapy.toml");
        fs::write(&path, "[paths]\noutput = \"public\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        let paths = &config.pipeline.paths;

        assert_eq!(paths.html.output, PathBuf::from("public"));
        assert_eq!(paths.styles.output, PathBuf::from("public/assets/css"));
        assert_eq!(config.server.root, temp.path().join("public"));
        assert!(bootstrapy_pipeline::Pipeline::new(&config.root, config.pipeline).is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bootstrapy.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempdir().unwrap();
        assert!(load(Some(&temp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn root_is_config_directory() {
        assert_eq!(config_root_dir(Path::new("bootstrapy.toml")), PathBuf::from("."));
        assert_eq!(
            config_root_dir(Path::new("site/bootstrapy.toml")),
            PathBuf::from("site")
        );
    }
}
