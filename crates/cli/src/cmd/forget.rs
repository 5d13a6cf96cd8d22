//! Remove a ledger entry so the unit is scanned again

use anyhow::{bail, Context, Result};
use ledger::{Ledger, ScanKey};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(config_path: &Path, name: &str, title: Option<u32>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let daemon = &config.daemon;

    let mut ledger = Ledger::open(daemon.ledger_path(), daemon.max_retries)
        .context("Failed to load ledger")?;

    let key = ScanKey::new(name, title);
    let Some(previous) = ledger.remove(&key) else {
        bail!("{} is not in the ledger", key);
    };

    ledger.persist().context("Failed to write ledger")?;

    println!("{} Forgot {} (was {:?})", "✓".green(), key.to_string().cyan(), previous);
    println!("{}", "The daemon picks this up on its next pass.".dimmed());

    Ok(())
}
