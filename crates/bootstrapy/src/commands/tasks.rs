//! Listing of the exported tasks.

use anyhow::Result;
use bootstrapy_pipeline::{ExportedTask, Pipeline};

use crate::config::Config;

/// Print every task with the steps it runs, in order.
pub fn run(config: &Config) -> Result<()> {
    let pipeline = Pipeline::new(&config.root, config.pipeline.clone())?;

    for line in describe(&pipeline)? {
        println!("{}", line);
    }

    Ok(())
}

fn describe(pipeline: &Pipeline) -> Result<Vec<String>> {
    ExportedTask::ALL
        .into_iter()
        .map(|task| -> Result<String> {
            let plan = pipeline.plan(task)?.join(" -> ");
            let suffix = if task.serves() { " -> watch + serve" } else { "" };
            Ok(format!("{:<10} {}{}", task.name(), plan, suffix))
        })
        .collect()
}
