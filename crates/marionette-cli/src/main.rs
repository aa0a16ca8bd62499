//! Entry point for the `marionette` binary.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default to warn to keep output clean; RUST_LOG or --verbose opens
    // it up.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = config::CliConfig::load()?;

    match cli.command {
        Commands::Classify { ref text } => {
            commands::classify(&text.join(" "), cli.json, &config)?;
        }
        Commands::Run {
            ref text,
            no_vision,
        } => {
            commands::run(&text.join(" "), no_vision, cli.json, &config).await?;
        }
        Commands::Caps => {
            commands::caps(cli.json)?;
        }
        Commands::Apps => {
            commands::apps().await?;
        }
        Commands::Battery => {
            commands::battery(cli.json).await?;
        }
        Commands::Permissions { request } => {
            commands::permissions(request, cli.json).await?;
        }
    }

    Ok(())
}
