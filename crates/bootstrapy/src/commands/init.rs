//! Scaffold a starter site.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::config_root_dir;

const STARTER_FILES: &[(&str, &str)] = &[
    ("src/index.html", DEFAULT_INDEX),
    ("src/partials/header.html", DEFAULT_HEADER),
    ("src/assets/scss/main.scss", DEFAULT_MAIN_SCSS),
    ("src/assets/scss/_variables.scss", DEFAULT_VARIABLES_SCSS),
    ("src/assets/js/main.js", DEFAULT_MAIN_JS),
];

const STARTER_DIRS: &[&str] = &["src/assets/images", "src/assets/fonts"];

/// Write the config file and starter sources. Existing files are kept
/// unless `yes` is set. Returns the files written.
pub fn run(config_path: &Path, yes: bool) -> Result<Vec<PathBuf>> {
    tracing::info!("Initializing bootstrapy...");

    let root = config_root_dir(config_path);
    let mut written = Vec::new();

    let files = std::iter::once((config_path.to_path_buf(), DEFAULT_CONFIG)).chain(
        STARTER_FILES
            .iter()
            .map(|(path, contents)| (root.join(path), *contents)),
    );

    for (path, contents) in files {
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
        written.push(path);
    }

    for dir in STARTER_DIRS {
        let dir = root.join(dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'bootstrapy' to build and start the development server.");

    Ok(written)
}

const DEFAULT_CONFIG: &str = r#"# Bootstrapy Configuration

[paths]
# Source and output roots; `clean` deletes the output root
input = "src"
output = "dist"

[paths.html]
input = "src/*.html"
# Partials also trigger a rebuild
watch = "src/**/*.html"
output = "dist"

[paths.styles]
input = "src/assets/scss/**/*.scss"
output = "dist/assets/css"

[paths.scripts]
input = "src/assets/js/**/*.js"
output = "dist/assets/js"

[paths.images]
input = "src/assets/images/**/*.*"
output = "dist/assets/images"

[paths.fonts]
input = "src/assets/fonts/**/*.*"
output = "dist/assets/fonts"

[html.data]
version = "1.0.0"
siteName = "Bootstrapy Theme"
cssPrefix = "app"

[styles]
browsers = ["last 2 versions"]

[server]
host = "127.0.0.1"
port = 3000
open = true

[watch]
debounce_ms = 100
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ siteName }}</title>
  <link rel="stylesheet" href="assets/css/main.css">
</head>
<body>
  {% include "partials/header.html" %}

  <main class="{{ cssPrefix }}-main">
    <p>Edit <code>src/index.html</code> and save to reload.</p>
  </main>

  <script src="assets/js/main.js"></script>
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header class="{{ cssPrefix }}-header">
  <h1>{{ siteName }}</h1>
  <small>v{{ version }}</small>
</header>
"#;

const DEFAULT_MAIN_SCSS: &str = r#"@import 'variables';

body {
  margin: 0;
  font-family: $font-stack;
  color: $text-color;
}

.app-header {
  padding: $spacing;
  background: $brand;
  user-select: none;

  h1 {
    margin: 0;
    color: #fff;
  }
}

.app-main {
  padding: $spacing;
}
"#;

const DEFAULT_VARIABLES_SCSS: &str = r#"$brand: #563d7c;
$text-color: #212529;
$font-stack: system-ui, -apple-system, sans-serif;
$spacing: 1rem;
"#;

const DEFAULT_MAIN_JS: &str = r#"(function () {
  var header = document.querySelector('.app-header');
  if (header) {
    header.addEventListener('click', function () {
      header.classList.toggle('is-active');
    });
  }
})();
"#;
