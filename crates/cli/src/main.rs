//! demuxd - unattended demuxing daemon

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::{logging, system_config};
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

/// Polls a directory and demuxes new media exactly once
#[derive(Parser)]
#[command(name = "demuxd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $DEMUXD_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground (default)
    Run,
    /// Show ledger counts and units that are retrying or abandoned
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Remove a unit from the ledger so it is scanned again
    Forget {
        /// Filename or disc directory name in the watched directory
        name: String,
        /// Disc title number
        #[arg(long)]
        title: Option<u32>,
    },
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the config file path
    Path {
        /// Write the template if the file does not exist
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
    /// Validate the config file
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = system_config::config_file_path(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Run);
    if !matches!(command, Commands::Run) {
        // stderr only, no file guard to hold
        logging::init(None, cli.verbose)?;
    }

    match command {
        Commands::Run => return cmd::run::run(&config_path, cli.verbose).await,
        Commands::Status { json } => cmd::status::run(&config_path, json)?,
        Commands::Forget { name, title } => cmd::forget::run(&config_path, &name, title)?,
        Commands::Config(ConfigCommands::Path { create }) => {
            cmd::config::run_path(&config_path, create)?
        }
        Commands::Config(ConfigCommands::Example) => cmd::config::run_example()?,
        Commands::Config(ConfigCommands::Check) => cmd::config::run_check(&config_path)?,
    }

    Ok(ExitCode::SUCCESS)
}
