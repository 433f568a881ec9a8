//! drt CLI - Main Entry Point
//!
//! Runs browser tests in a headless rendering engine against a shared
//! per-project dev server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config, run, serve};
use drt_common::{DrtConfig, DEFAULT_CONFIG_FILE};

/// drt - headless browser test runner
#[derive(Parser)]
#[command(name = "drt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "DRT_CONFIG", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run browser tests
    Run(run::RunArgs),

    /// Start a project's dev server and keep it running
    Serve(serve::ServeArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    tracing::debug!(version = drt_common::VERSION, "drt starting");

    let config = match DrtConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("{}: {}", cli.config.display(), e));
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Run(args) => {
            let summary = match run::execute(args, config, cli.format).await {
                Ok(summary) => summary,
                Err(e) => {
                    output::print_error(&e.to_string());
                    run::RunSummary::SetupFailed
                }
            };
            std::process::exit(summary.exit_code());
        }
        Commands::Serve(args) => serve::execute(args, config).await?,
        Commands::Config(cmd) => config::execute(cmd, config, &cli.config, cli.format)?,
    }

    Ok(())
}
