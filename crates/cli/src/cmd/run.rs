//! Run the daemon in the foreground

use super::{EXIT_CONFIG, EXIT_LEDGER};
use anyhow::Result;
use cli_lib::system_config::{self, ConfigError};
use cli_lib::{logging, shutdown_signal, ExtensionRegistry, ScanLoop};
use ledger::Ledger;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

pub async fn run(config_path: &Path, verbose: bool) -> Result<ExitCode> {
    // 1. Load configuration; a missing file gets a template to edit
    let config = match system_config::load(config_path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(path)) => {
            let _guard = logging::init(None, verbose)?;
            match system_config::init_if_missing(&path) {
                Ok(_) => error!(
                    path = %path.display(),
                    "no configuration found, wrote a template; edit it and restart"
                ),
                Err(e) => error!("no configuration found: {}", e),
            }
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
        Err(e) => {
            let _guard = logging::init(None, verbose)?;
            error!("invalid configuration: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    // 2. Logging (held for the life of the process)
    let _guard = logging::init(Some(&config.logging), verbose)?;
    let daemon = &config.daemon;

    if !daemon.watch_dir.is_dir() {
        error!(
            watch_dir = %daemon.watch_dir.display(),
            "watched directory does not exist or is not a directory"
        );
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    // 3. Ledger
    let ledger = match Ledger::open(daemon.ledger_path(), daemon.max_retries) {
        Ok(ledger) => ledger,
        Err(e) => {
            error!("failed to load ledger: {}", e);
            return Ok(ExitCode::from(EXIT_LEDGER));
        }
    };
    info!(
        path = %ledger.path().display(),
        entries = ledger.len(),
        "ledger loaded"
    );

    // 4. Scanner and extensions
    let scanner = scanner::from_target(&daemon.scanner, &daemon.scanner_args, &daemon.watch_dir);
    let mut extensions = ExtensionRegistry::from_config(&config.hooks, &daemon.watch_dir);
    extensions.load_all().await;

    let scan = match ScanLoop::new(daemon, ledger, scanner, extensions) {
        Ok(scan) => scan,
        Err(e) => {
            error!("invalid configuration: {:#}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    // 5. Poll until SIGINT/SIGTERM
    let shutdown = shutdown_signal()?;
    scan.run(shutdown).await;

    Ok(ExitCode::SUCCESS)
}
