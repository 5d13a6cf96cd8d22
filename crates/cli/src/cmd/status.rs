//! Show what the ledger knows about the watched directory

use anyhow::{Context, Result};
use ledger::{Attempts, Ledger, Summary};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct StatusReport {
    ledger: PathBuf,
    max_retries: u32,
    summary: Summary,
    retrying: Vec<UnitStatus>,
    abandoned: Vec<UnitStatus>,
}

#[derive(Debug, Serialize)]
struct UnitStatus {
    name: String,
    title: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<u32>,
}

fn collect(ledger: &Ledger) -> StatusReport {
    let mut retrying = Vec::new();
    let mut abandoned = Vec::new();

    for (key, attempts) in ledger.entries() {
        let unit = |failures| UnitStatus {
            name: key.name().to_string(),
            title: key.title(),
            failures,
        };
        match attempts {
            Attempts::Retrying(n) => retrying.push(unit(Some(n))),
            Attempts::Abandoned => abandoned.push(unit(None)),
            Attempts::Success => {}
        }
    }

    StatusReport {
        ledger: ledger.path().to_path_buf(),
        max_retries: ledger.max_retries(),
        summary: ledger.summary(),
        retrying,
        abandoned,
    }
}

fn unit_label(unit: &UnitStatus) -> String {
    match unit.title {
        Some(title) => format!("{} title {}", unit.name, title),
        None => unit.name.clone(),
    }
}

pub fn run(config_path: &Path, json: bool) -> Result<()> {
    // 1. Load configuration and ledger
    let config = super::load_config(config_path)?;
    let daemon = &config.daemon;
    let ledger = Ledger::open(daemon.ledger_path(), daemon.max_retries)
        .context("Failed to load ledger")?;

    let report = collect(&ledger);

    // 2. Machine-readable output
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // 3. Display output
    println!("{}", "Ledger Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Watching:      {}", daemon.watch_dir.display().to_string().cyan());
    println!("Ledger:        {}", report.ledger.display());
    println!("Max retries:   {}", report.max_retries);
    println!();

    println!("Entries:");
    println!("  Succeeded:   {}", report.summary.succeeded.to_string().green());
    println!("  Retrying:    {}", report.summary.retrying.to_string().yellow());
    println!("  Abandoned:   {}", report.summary.abandoned.to_string().red());
    println!();

    if !report.retrying.is_empty() {
        println!("Retrying:");
        for unit in &report.retrying {
            println!(
                "  {} {}",
                unit_label(unit),
                format!("({}/{})", unit.failures.unwrap_or(0), report.max_retries).dimmed()
            );
        }
        println!();
    }

    if !report.abandoned.is_empty() {
        println!("Abandoned:");
        for unit in &report.abandoned {
            println!("  {}", unit_label(unit).red());
        }
        println!();
        println!(
            "{}",
            "Tip: 'demuxd forget <name> [--title N]' makes a unit eligible again".dimmed()
        );
    }

    Ok(())
}
