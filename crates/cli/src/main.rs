//! alt-text-bot CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flag wins over the config file; a broken config is reported by the command itself
    let log_level = cli.log_level.clone().unwrap_or_else(|| {
        AppConfig::load(cli.config.as_deref())
            .map(|config| config.general.log_level)
            .unwrap_or_else(|_| "info".to_string())
    });
    init_logging(&log_level)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.config).await,
        Commands::Reply(args) => commands::reply::execute(args, cli.config).await,
        Commands::Parse(args) => commands::parse::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args).await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
