//! Configuration commands

use anyhow::Result;
use cli_lib::system_config;
use owo_colors::OwoColorize;
use std::path::Path;

/// Show the config file path and optionally create it
pub fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && !config_path.exists() {
        system_config::init_if_missing(config_path)?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}

/// Validate the config file and summarize it
pub fn run_check(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let daemon = &config.daemon;

    println!("{} {} is valid", "✓".green(), config_path.display());
    println!();
    println!("{}", "[daemon]".yellow());
    println!("  {} = {}", "watch_dir".cyan(), daemon.watch_dir.display());
    println!("  {} = {}", "scanner".cyan(), daemon.scanner);
    println!("  {} = {}", "max_retries".cyan(), daemon.max_retries);
    println!("  {} = {}", "languages".cyan(), daemon.languages.join(", "));
    println!(
        "  {} = {}",
        "sleep_minutes".cyan(),
        daemon.sleep_interval.as_secs() / 60
    );
    println!("  {} = {}", "record_file".cyan(), daemon.record_file);
    if !daemon.ignore.is_empty() {
        println!("  {} = {:?}", "ignore".cyan(), daemon.ignore);
    }

    if let Some(directory) = &config.logging.directory {
        println!("\n{}", "[logging]".yellow());
        println!("  {} = {}", "directory".cyan(), directory.display());
    }

    for hook in &config.hooks {
        println!("\n{}", "[[hooks]]".yellow());
        println!("  {} = {}", "name".cyan(), hook.name);
        println!("  {} = {}", "command".cyan(), hook.command.display());
        if let Some(priority) = hook.priority {
            println!("  {} = {}", "priority".cyan(), priority);
        }
    }

    if !daemon.watch_dir.is_dir() {
        println!();
        println!(
            "{}",
            format!("Warning: {} is not a directory", daemon.watch_dir.display()).yellow()
        );
    }

    Ok(())
}
