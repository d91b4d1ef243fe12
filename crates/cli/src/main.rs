//! routeshot CLI - Main Entry Point
//!
//! Scans a project's routes, manages its fixture document, captures
//! screenshots and moves the project through the review workflow.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{capture, fixtures, routes, workflow, Context};

/// routeshot - Fixture-driven route screenshots
#[derive(Parser)]
#[command(name = "routeshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true, env = "ROUTESHOT_PROJECT")]
    project: PathBuf,

    /// Configuration file (defaults to routeshot.toml in the project root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and list routes
    #[command(subcommand)]
    Routes(routes::RoutesCommands),

    /// Manage the fixture document
    #[command(subcommand)]
    Fixtures(fixtures::FixturesCommands),

    /// Capture screenshots of every route instance
    Capture(capture::CaptureArgs),

    /// Review workflow state and annotations
    #[command(subcommand)]
    Workflow(workflow::WorkflowCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("routeshot CLI v{}", routeshot_common::VERSION);
        return Ok(());
    }

    let ctx = Context::load(cli.project, cli.config.as_deref(), cli.format)?;

    match cli.command {
        Commands::Routes(cmd) => routes::execute(cmd, &ctx).await?,
        Commands::Fixtures(cmd) => fixtures::execute(cmd, &ctx).await?,
        Commands::Capture(args) => capture::execute(args, &ctx).await?,
        Commands::Workflow(cmd) => workflow::execute(cmd, &ctx).await?,
        Commands::Version => {}
    }

    Ok(())
}
