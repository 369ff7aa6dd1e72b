// ABOUTME: Entry point for the kagglelab CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use kagglelab::config::Config;
use kagglelab::error::Result;
use kagglelab::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, output.clone()).await {
        output.error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    if let Commands::Init { competition, force } = &cli.command {
        return commands::init(competition.as_deref(), *force, &output);
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Plan => commands::plan(&config, &output),
        Commands::Build => commands::build(&config, output).await,
        Commands::Serve { port } => commands::serve(&config, port, output).await,
        Commands::Debug => commands::debug(&config, output).await,
        Commands::Stop => commands::stop(&config, output).await,
    }
}
