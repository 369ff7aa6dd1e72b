// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kagglelab")]
#[command(about = "Reproducible Kaggle data pipelines and notebooks on Docker or Podman")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: kagglelab.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new kagglelab.yml configuration file
    Init {
        /// Competition slug to import
        #[arg(long)]
        competition: Option<String>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the steps that would run, without contacting the engine
    Plan,

    /// Run the pipeline and print the resulting image
    Build,

    /// Build and start the notebook server
    Serve {
        /// Host port to publish the notebook on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build and start an interactive shell container
    Debug,

    /// Stop and remove this project's service and shell containers
    Stop,
}
