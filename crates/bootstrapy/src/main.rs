//! Bootstrapy CLI - asset build runner for static sites.

use std::path::PathBuf;

use anyhow::Result;
use bootstrapy_pipeline::ExportedTask;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "bootstrapy")]
#[command(about = "Builds templated pages, styles, scripts and assets, and serves them with live reload")]
#[command(version)]
pub struct Cli {
    /// Task to run (defaults to `default`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to bootstrapy.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not open browser
    #[arg(long)]
    pub no_open: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build pages, styles, scripts and images, then watch and serve
    Default(ServeArgs),

    /// Build every category, then watch and serve
    Watch(ServeArgs),

    /// Clean and build everything, including minified styles and scripts
    Build,

    /// Render HTML pages
    Html,

    /// Compile and prefix stylesheets
    Scss,

    /// Compile stylesheets and write minified copies
    #[command(name = "minifyCss", alias = "minify-css")]
    MinifyCss,

    /// Copy scripts
    Js,

    /// Copy scripts and write minified copies
    #[command(name = "minifyJs", alias = "minify-js")]
    MinifyJs,

    /// Copy images
    Images,

    /// Copy fonts
    Fonts,

    /// Delete the output directory
    Clean,

    /// List tasks and what they run
    Tasks,

    /// Scaffold a starter site in the current project
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

impl Commands {
    fn task(&self) -> Option<ExportedTask> {
        let task = match self {
            Commands::Default(_) => ExportedTask::Default,
            Commands::Watch(_) => ExportedTask::Watch,
            Commands::Build => ExportedTask::Build,
            Commands::Html => ExportedTask::Html,
            Commands::Scss => ExportedTask::Scss,
            Commands::MinifyCss => ExportedTask::MinifyCss,
            Commands::Js => ExportedTask::Js,
            Commands::MinifyJs => ExportedTask::MinifyJs,
            Commands::Images => ExportedTask::Images,
            Commands::Fonts => ExportedTask::Fonts,
            Commands::Clean => ExportedTask::Clean,
            Commands::Tasks | Commands::Init { .. } => return None,
        };
        Some(task)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Default(ServeArgs::default()));

    if let Commands::Init { yes } = command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
        commands::init::run(&path, yes)?;
        return Ok(());
    }

    let config = config::load(cli.config.as_deref())?;

    match (command.task(), command) {
        (Some(task), Commands::Default(args) | Commands::Watch(args)) => {
            commands::dev::run(config, task, args).await?;
        }
        (Some(task), _) => {
            commands::run::run(&config, task)?;
        }
        (None, _) => {
            commands::tasks::run(&config)?;
        }
    }

    Ok(())
}
