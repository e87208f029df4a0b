//! rutas command-line client.
//!
//! Every subcommand goes through the same cache controller as the proxy, so
//! it keeps working offline once a generation is installed.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use rutas_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::commands::CommandExecutor;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_file = args.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = AppConfig::load_from(config_file.as_deref()).context("failed to load configuration")?;

    let executor = CommandExecutor::new(config, args.json).await?;
    executor.run(args.command).await
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .json()
        .init();
}
