//! One-shot tasks: build, the single categories and clean.

use std::time::Instant;

use anyhow::{Context, Result};
use bootstrapy_pipeline::{ExportedTask, Pipeline};

use crate::config::Config;

/// Run a task once and report what it wrote.
pub fn run(config: &Config, task: ExportedTask) -> Result<()> {
    let start = Instant::now();
    let pipeline = Pipeline::new(&config.root, config.pipeline.clone())
        .context("Invalid configuration")?;

    let report = pipeline
        .run(task)
        .with_context(|| format!("Task '{}' failed", task))?;

    tracing::info!(
        "Finished '{}': {} file(s) in {}ms",
        task,
        report.files(),
        start.elapsed().as_millis()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootstrapy_pipeline::PipelineSettings;
    use bootstrapy_server::DevServerConfig;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(root: &std::path::Path) -> Config {
        Config {
            root: root.to_path_buf(),
            pipeline: PipelineSettings::default(),
            server: DevServerConfig::default(),
            debounce: Duration::ZERO,
        }
    }

    #[test]
    fn runs_single_category() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/assets/fonts")).unwrap();
        fs::write(temp.path().join("src/assets/fonts/a.woff"), "font").unwrap();

        run(&config(temp.path()), ExportedTask::Fonts).unwrap();

        assert!(temp.path().join("dist/assets/fonts/a.woff").exists());
    }

    #[test]
    fn failures_name_the_task() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/index.html"), "{% if %}").unwrap();

        let err = run(&config(temp.path()), ExportedTask::Html).unwrap_err();

        assert!(err.to_string().contains("Task 'html' failed"));
    }
}
