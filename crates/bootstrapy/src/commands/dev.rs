//! Development server command: build, then watch and serve.

use std::sync::Arc;

use anyhow::{Context, Result};
use bootstrapy_pipeline::{ExportedTask, Pipeline};
use bootstrapy_server::{DevServer, FileWatcher, WatchLoop};

use crate::config::Config;
use crate::ServeArgs;

/// Run the initial build, then serve the output with live reload until Ctrl-C.
pub async fn run(config: Config, task: ExportedTask, args: ServeArgs) -> Result<()> {
    let pipeline = Arc::new(
        Pipeline::new(&config.root, config.pipeline.clone()).context("Invalid configuration")?,
    );

    let report = pipeline
        .run(task)
        .with_context(|| format!("Task '{}' failed", task))?;
    tracing::info!("Initial build wrote {} file(s)", report.files());

    let mut server_config = config.server.clone();
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if args.no_open {
        server_config.open = false;
    }

    let server = DevServer::new(server_config);
    let hub = server.hub();
    let bound = server.bind().await?;

    let (watcher, events) = FileWatcher::new(pipeline.root(), &pipeline.watch_globs())
        .context("Failed to start file watcher")?;

    let rebuilder = Arc::clone(&pipeline);
    let watch_loop = tokio::spawn(
        WatchLoop::new(move || rebuilder.rebuild().map(|_| ()), hub)
            .with_debounce(config.debounce)
            .run(events),
    );

    tracing::info!("Watching for changes. Press Ctrl-C to stop.");
    bound.serve(shutdown_signal()).await?;

    // Dropping the watcher closes the event channel and ends the loop.
    drop(watcher);
    let stats = watch_loop.await?;
    tracing::info!(
        "Stopped after {} rebuild(s), {} failed",
        stats.rebuilds,
        stats.failures
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
